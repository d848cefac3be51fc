use std::io::{Cursor, Write};

use linkbinder_core::Chapter;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::EpubError;
use crate::xml::escape_xml;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const STYLES_CSS: &str = "body {
  font-family: sans-serif;
}

h1 {
  text-align: center;
}

img.responsive-img {
  max-width: 100%;
  height: auto;
}
";

/// Accumulates a titled, ordered set of chapters and serializes them into a
/// valid EPUB container.
///
/// Chapters stay sorted ascending by id regardless of insertion order, and
/// distinct chapter authors accumulate into the book's creator list in
/// first-seen order.
pub struct EpubBuilder {
    title: String,
    identifier: String,
    authors: Vec<String>,
    chapters: Vec<Chapter>,
}

impl EpubBuilder {
    /// Requires a non-empty (trimmed) book title; generates the book's URN
    /// identifier at construction time.
    pub fn new(title: &str) -> Result<Self, EpubError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EpubError::MissingTitle);
        }
        Ok(Self {
            title: title.to_string(),
            identifier: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            authors: Vec::new(),
            chapters: Vec::new(),
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Chapter titles in spine order, for introspection.
    pub fn chapter_titles(&self) -> Vec<&str> {
        self.chapters.iter().map(|ch| ch.title.as_str()).collect()
    }

    /// Validates and stores one chapter. A chapter whose URL is already
    /// present collapses into the first occurrence.
    pub fn add_chapter(&mut self, chapter: Chapter) -> Result<(), EpubError> {
        let title = chapter.title.trim();
        if title.is_empty() {
            return Err(EpubError::ChapterMissingTitle { id: chapter.id });
        }
        if chapter.content.trim().is_empty() {
            return Err(EpubError::ChapterMissingContent { id: chapter.id });
        }
        if self.chapters.iter().any(|existing| existing.url == chapter.url) {
            return Ok(());
        }

        if let Some(author) = chapter
            .author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
        {
            if !self.authors.iter().any(|existing| existing == author) {
                self.authors.push(author.to_string());
            }
        }

        let stored = Chapter {
            title: title.to_string(),
            content: chapter_xhtml(title, &chapter.content),
            ..chapter
        };
        let at = self.chapters.partition_point(|existing| existing.id <= stored.id);
        self.chapters.insert(at, stored);
        Ok(())
    }

    /// Serializes the accumulated book into EPUB archive bytes.
    pub fn generate(&self) -> Result<Vec<u8>, EpubError> {
        if self.chapters.is_empty() {
            return Err(EpubError::NoChapters);
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // The mimetype entry must be first and uncompressed.
        zip.start_file("mimetype", stored)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated)?;
        zip.write_all(self.package_document().as_bytes())?;

        zip.start_file("OEBPS/nav.xhtml", deflated)?;
        zip.write_all(self.nav_document().as_bytes())?;

        zip.start_file("OEBPS/toc.ncx", deflated)?;
        zip.write_all(self.ncx_document().as_bytes())?;

        for chapter in &self.chapters {
            zip.start_file(format!("OEBPS/{}", chapter_file_name(chapter.id)), deflated)?;
            zip.write_all(chapter.content.as_bytes())?;
        }

        zip.start_file("OEBPS/styles.css", deflated)?;
        zip.write_all(STYLES_CSS.as_bytes())?;

        let bytes = zip.finish()?.into_inner();
        if bytes.is_empty() {
            return Err(EpubError::EmptyOutput);
        }
        Ok(bytes)
    }

    fn package_document(&self) -> String {
        let mut opf = String::new();
        opf.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
        );
        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape_xml(&self.identifier)
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape_xml(&self.title)
        ));
        opf.push_str("    <dc:language>en</dc:language>\n");
        for author in &self.authors {
            opf.push_str(&format!(
                "    <dc:creator>{}</dc:creator>\n",
                escape_xml(author)
            ));
        }
        opf.push_str("  </metadata>\n  <manifest>\n");
        opf.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        opf.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
        for chapter in &self.chapters {
            opf.push_str(&format!(
                "    <item id=\"chapter-{id}\" href=\"{href}\" media-type=\"application/xhtml+xml\"/>\n",
                id = chapter.id,
                href = chapter_file_name(chapter.id)
            ));
        }
        opf.push_str("    <item id=\"styles\" href=\"styles.css\" media-type=\"text/css\"/>\n");
        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        opf.push_str("    <itemref idref=\"nav\"/>\n");
        for chapter in &self.chapters {
            opf.push_str(&format!("    <itemref idref=\"chapter-{}\"/>\n", chapter.id));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }

    fn nav_document(&self) -> String {
        let mut nav = String::new();
        nav.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en">
  <head>
    <meta charset="UTF-8" />
    <title>Table of Contents</title>
  </head>
  <body>
    <nav id="toc" epub:type="toc">
      <h1>Table of Contents</h1>
      <ol>
"#,
        );
        for chapter in &self.chapters {
            nav.push_str(&format!(
                "        <li><a epub:type=\"bodymatter\" href=\"{href}\">{title}</a></li>\n",
                href = chapter_file_name(chapter.id),
                title = escape_xml(&chapter.title)
            ));
        }
        nav.push_str("      </ol>\n    </nav>\n  </body>\n</html>\n");
        nav
    }

    fn ncx_document(&self) -> String {
        let mut ncx = String::new();
        ncx.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
"#,
        );
        ncx.push_str(&format!(
            "    <meta name=\"dtb:uid\" content=\"{}\"/>\n",
            escape_xml(&self.identifier)
        ));
        ncx.push_str("    <meta name=\"dtb:depth\" content=\"1\"/>\n");
        ncx.push_str("  </head>\n");
        ncx.push_str(&format!(
            "  <docTitle><text>{}</text></docTitle>\n  <navMap>\n",
            escape_xml(&self.title)
        ));
        for (order, chapter) in self.chapters.iter().enumerate() {
            ncx.push_str(&format!(
                r#"    <navPoint id="navpoint-{id}" playOrder="{order}">
      <navLabel><text>{title}</text></navLabel>
      <content src="{href}"/>
    </navPoint>
"#,
                id = chapter.id,
                order = order + 1,
                title = escape_xml(&chapter.title),
                href = chapter_file_name(chapter.id)
            ));
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }
}

fn chapter_file_name(id: u32) -> String {
    format!("chapter_{id}.xhtml")
}

/// Wrap normalized article content in a minimal self-contained XHTML shell.
fn chapter_xhtml(title: &str, content: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en">
  <head>
    <meta charset="UTF-8" />
    <link rel="stylesheet" type="text/css" href="styles.css"/>
    <title>{title}</title>
  </head>
  <body>
    <h1>{title}</h1>
    <section epub:type="chapter">
      {content}
    </section>
  </body>
</html>
"#,
        title = escape_xml(title),
        content = content
    )
}
