use std::io::{Cursor, Read};

use linkbinder_core::Chapter;
use linkbinder_engine::{EpubBuilder, EpubError};
use pretty_assertions::assert_eq;
use zip::ZipArchive;

fn chapter(id: u32, title: &str, author: Option<&str>) -> Chapter {
    Chapter {
        id,
        url: format!("https://blog.test/{id}"),
        title: title.to_string(),
        content: format!("<p>content of {title}</p>"),
        author: author.map(str::to_string),
    }
}

fn read_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn builder_requires_a_title() {
    assert!(matches!(EpubBuilder::new("   "), Err(EpubError::MissingTitle)));
}

#[test]
fn chapter_validation_names_the_offender() {
    let mut builder = EpubBuilder::new("Book").unwrap();

    let err = builder.add_chapter(chapter(7, "  ", None)).unwrap_err();
    assert!(matches!(err, EpubError::ChapterMissingTitle { id: 7 }));

    let mut empty = chapter(9, "Has Title", None);
    empty.content = "  ".to_string();
    let err = builder.add_chapter(empty).unwrap_err();
    assert!(matches!(err, EpubError::ChapterMissingContent { id: 9 }));
}

#[test]
fn generation_requires_at_least_one_chapter() {
    let builder = EpubBuilder::new("Book").unwrap();
    assert!(matches!(builder.generate(), Err(EpubError::NoChapters)));
}

#[test]
fn mimetype_is_first_and_stored() {
    let mut builder = EpubBuilder::new("Book").unwrap();
    builder.add_chapter(chapter(1, "One", None)).unwrap();
    let bytes = builder.generate().unwrap();

    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    let mut content = String::new();
    first.read_to_string(&mut content).unwrap();
    assert_eq!(content, "application/epub+zip");
}

#[test]
fn archive_contains_required_structure() {
    let mut builder = EpubBuilder::new("Book").unwrap();
    builder.add_chapter(chapter(1, "One", None)).unwrap();
    builder.add_chapter(chapter(2, "Two", None)).unwrap();
    let bytes = builder.generate().unwrap();

    let mut archive = ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    for required in [
        "mimetype",
        "META-INF/container.xml",
        "OEBPS/content.opf",
        "OEBPS/nav.xhtml",
        "OEBPS/toc.ncx",
        "OEBPS/chapter_1.xhtml",
        "OEBPS/chapter_2.xhtml",
        "OEBPS/styles.css",
    ] {
        assert!(names.iter().any(|n| n == required), "missing {required}");
    }

    let container = read_entry(&bytes, "META-INF/container.xml");
    assert!(container.contains("OEBPS/content.opf"));

    let chapter_1 = read_entry(&bytes, "OEBPS/chapter_1.xhtml");
    assert!(chapter_1.contains("<h1>One</h1>"));
    assert!(chapter_1.contains("content of One"));
    assert!(chapter_1.contains("styles.css"));
}

#[test]
fn insertion_order_does_not_affect_spine_order() {
    let mut forward = EpubBuilder::new("Book").unwrap();
    forward.add_chapter(chapter(1, "One", None)).unwrap();
    forward.add_chapter(chapter(2, "Two", None)).unwrap();
    forward.add_chapter(chapter(3, "Three", None)).unwrap();

    let mut shuffled = EpubBuilder::new("Book").unwrap();
    shuffled.add_chapter(chapter(3, "Three", None)).unwrap();
    shuffled.add_chapter(chapter(1, "One", None)).unwrap();
    shuffled.add_chapter(chapter(2, "Two", None)).unwrap();

    assert_eq!(forward.chapter_titles(), shuffled.chapter_titles());
    assert_eq!(forward.chapter_titles(), vec!["One", "Two", "Three"]);

    let opf = read_entry(&shuffled.generate().unwrap(), "OEBPS/content.opf");
    let spine_1 = opf.find("<itemref idref=\"chapter-1\"/>").unwrap();
    let spine_2 = opf.find("<itemref idref=\"chapter-2\"/>").unwrap();
    let spine_3 = opf.find("<itemref idref=\"chapter-3\"/>").unwrap();
    assert!(spine_1 < spine_2 && spine_2 < spine_3);
}

#[test]
fn authors_accumulate_deduplicated_in_first_seen_order() {
    let mut builder = EpubBuilder::new("Book").unwrap();
    builder.add_chapter(chapter(1, "One", Some("Alice"))).unwrap();
    builder.add_chapter(chapter(2, "Two", Some("Bob"))).unwrap();
    builder.add_chapter(chapter(3, "Three", Some("Alice"))).unwrap();
    builder.add_chapter(chapter(4, "Four", Some("  "))).unwrap();

    assert_eq!(builder.authors(), ["Alice".to_string(), "Bob".to_string()]);

    let opf = read_entry(&builder.generate().unwrap(), "OEBPS/content.opf");
    let alice = opf.find("<dc:creator>Alice</dc:creator>").unwrap();
    let bob = opf.find("<dc:creator>Bob</dc:creator>").unwrap();
    assert!(alice < bob);
}

#[test]
fn duplicate_urls_collapse_to_first_occurrence() {
    let mut builder = EpubBuilder::new("Book").unwrap();
    builder.add_chapter(chapter(1, "One", None)).unwrap();
    let mut dup = chapter(2, "Two", None);
    dup.url = "https://blog.test/1".to_string();
    builder.add_chapter(dup).unwrap();

    assert_eq!(builder.chapter_count(), 1);
    assert_eq!(builder.chapter_titles(), vec!["One"]);
}

#[test]
fn user_text_is_xml_escaped() {
    let mut builder = EpubBuilder::new(r#"Tom & "Jerry" <3"#).unwrap();
    builder
        .add_chapter(chapter(1, "Q&A <special>", Some("O'Brien & co")))
        .unwrap();
    let bytes = builder.generate().unwrap();

    let opf = read_entry(&bytes, "OEBPS/content.opf");
    assert!(opf.contains("Tom &amp; &quot;Jerry&quot; &lt;3"));
    assert!(opf.contains("O&apos;Brien &amp; co"));

    let nav = read_entry(&bytes, "OEBPS/nav.xhtml");
    assert!(nav.contains("Q&amp;A &lt;special&gt;"));
    assert!(!nav.contains("<special>"));
}

#[test]
fn identifier_is_a_urn_uuid() {
    let builder = EpubBuilder::new("Book").unwrap();
    assert!(builder.identifier().starts_with("urn:uuid:"));
    assert_eq!(builder.identifier().len(), "urn:uuid:".len() + 36);
}
