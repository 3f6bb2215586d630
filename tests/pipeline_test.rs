//! End-to-end pipeline tests.
//!
//! Drives the full configured pass chain over a realistic word-processor
//! export and checks the produced book artifacts: the primary XHTML, the
//! split section files, the injected stylesheet, and the OPF package.

use std::path::Path;

use tempfile::TempDir;

use wordbook::Processor;

const INPUT: &str = r##"<html>
<head>
<meta name="Generator" content="Microsoft Word 15">
<title>Flowers</title>
<style>p.MsoNormal { margin: 0cm }</style>
</head>
<body lang="DE-AT" style="tab-interval:35.4pt">
<div class="WordSection1">
<p class="MsoToc1"><span>Chapter One<span>... 3</span></span></p>
</div>
<div class="WordSection2">
<h1><a name="_Toc1">Chapter One</a></h1>
<p class="MsoTitle">Flowers</p>
<p class="MsoNormal">A claim<a href="#_ftn1" name="_ftnref1"><span><span>[1]</span></span></a> needing support.</p>
<p class="MsoListParagraph">&middot; First point</p>
<p class="MsoListParagraph">&middot; Second point</p>
<p class="MsoNormal"><a href="#_ftnref1" name="_ftn1">[1]</a> The fine print.</p>
</div>
</body>
</html>"##;

const PROPERTIES: &str = r#"# pass chain
transformer.01 = metadata
transformer.02 = attribute
transformer.03 = style
transformer.04 = list-paragraph
transformer.05 = footnote
transformer.06 = toc
transformer.07 = section
transformer.08 = opf

attribute.remove.body.style = true
attribute.replace.body.lang = DE

style.replace.title = MsoTitle,Title
style.replace.whitelist = MsoToc, MsoList, MsoFootnote, MsoNormal, WordSection, Toc

opf.metadata.title = Flowers
opf.metadata.author = Peter Post
opf.metadata.language = DE
opf.manifest.cover.image = images/book-cover.jpg
opf.manifest.cover.image.type = image/jpeg
"#;

const OPF_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata>
  </metadata>
  <manifest>
  </manifest>
  <spine>
  </spine>
</package>"#;

fn setup(tmp: &TempDir) -> std::path::PathBuf {
    let input = tmp.path().join("WebPage02.html");
    std::fs::write(&input, INPUT).unwrap();
    std::fs::write(tmp.path().join("wordbook.properties"), PROPERTIES).unwrap();
    std::fs::write(tmp.path().join("opf-template.xml"), OPF_TEMPLATE).unwrap();
    std::fs::write(tmp.path().join("book.css"), "p { margin: 0 }\n").unwrap();
    input
}

fn processor(tmp: &TempDir) -> Processor {
    Processor::builder()
        .bookdir(tmp.path().join("book"))
        .css("book.css")
        .build()
}

#[test]
fn full_chain_produces_book_artifacts() {
    let tmp = TempDir::new().unwrap();
    let input = setup(&tmp);
    let out = processor(&tmp).process(&input).unwrap();

    let book = tmp.path().join("book");
    assert!(book.join("WebPage02.html").is_file());
    assert!(book.join("WordSection1.xhtml").is_file());
    assert!(book.join("WebPage02.opf").is_file());
    assert!(book.join("book.css").is_file());

    // The nav section truncates the export: the second section stays in
    // the primary output instead of getting its own file.
    assert!(!book.join("WordSection2.xhtml").exists());
    assert!(out.contains(r#"<div class="WordSection2">"#), "{out}");
}

#[test]
fn passes_rewrite_the_document() {
    let tmp = TempDir::new().unwrap();
    let input = setup(&tmp);
    let out = processor(&tmp).process(&input).unwrap();

    // metadata
    assert!(
        out.contains(r#"content="Microsoft Word 15 - wordbook""#),
        "{out}"
    );
    // attribute rules
    assert!(out.contains(r#"<body lang="DE">"#), "{out}");
    // style injection and class rewriting
    assert!(!out.contains("<style>"), "{out}");
    assert!(
        out.contains(r#"<link rel="stylesheet" type="text/css" href="book.css" />"#),
        "{out}"
    );
    assert!(out.contains(r#"<p class="Title">"#), "{out}");
    // lists
    assert!(out.contains("<ul>"), "{out}");
    assert!(
        out.contains(r#"<li class="MsoListParagraph">First point</li>"#),
        "{out}"
    );
    // footnotes
    assert!(
        out.contains(r##"<span class="MsoFootnoteReference"><a href="#_ftn1" name="_ftnref1">[1]</a></span>"##),
        "{out}"
    );
}

#[test]
fn toc_section_becomes_nav_file() {
    let tmp = TempDir::new().unwrap();
    let input = setup(&tmp);
    processor(&tmp).process(&input).unwrap();

    let nav = std::fs::read_to_string(tmp.path().join("book/WordSection1.xhtml")).unwrap();
    assert!(nav.contains(r#"<nav epub:type="toc">"#), "{nav}");
    assert!(
        nav.contains(r##"<a href="WordSection2.xhtml#_Toc1">Chapter One</a>"##),
        "{nav}"
    );
}

#[test]
fn opf_references_nav_section_and_content() {
    let tmp = TempDir::new().unwrap();
    let input = setup(&tmp);
    processor(&tmp).process(&input).unwrap();

    let opf = std::fs::read_to_string(tmp.path().join("book/WebPage02.opf")).unwrap();
    assert!(opf.contains("<dc:title>Flowers</dc:title>"), "{opf}");
    assert!(
        opf.contains(r#"id="WordSection1" href="WordSection1.xhtml" properties="nav""#),
        "{opf}"
    );
    assert!(opf.contains(r#"id="Content" href="WebPage02.html""#), "{opf}");
    assert!(!opf.contains("WordSection2"), "{opf}");
}

#[test]
fn discovered_output_format_applies() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.html");
    std::fs::write(&input, "<html><body><div><p>One</p><p>Two</p></div></body></html>").unwrap();
    std::fs::write(
        tmp.path().join("wordbook.properties"),
        "output.format = pretty\n",
    )
    .unwrap();

    let out = Processor::builder()
        .bookdir(tmp.path().join("book"))
        .build()
        .process(&input)
        .unwrap();
    assert!(out.contains("\n    <div>\n"), "{out}");
}

#[test]
fn trigger_free_output_is_stable() {
    // Processing the pipeline's own output again must not change it.
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in.html");
    std::fs::write(
        &input,
        "<html><head><title>T</title></head><body><p>Hello <b>World</b></p><ul><li>a</li></ul></body></html>",
    )
    .unwrap();

    let processor = Processor::builder()
        .bookdir(tmp.path().join("book"))
        .build();
    let first = processor.process(&input).unwrap();

    let second_input = tmp.path().join("book/in.html");
    assert!(Path::new(&second_input).is_file());
    let second = Processor::builder()
        .bookdir(tmp.path().join("book2"))
        .build()
        .process(&second_input)
        .unwrap();
    assert_eq!(first, second);
}
