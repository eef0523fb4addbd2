//! Integration tests for the reconstruction pipeline.

use std::io::Write;

use unflat::{
    load_pages, reconstruct, reconstruct_many, reconstruct_with_options, Block, BoundingBox, DocumentKind,
    JsonFormat, Language, Line, Node, Page, ReconstructOptions, Role, Span, Structure, Unflat,
};

fn text_block(role: Role, page: u32, y: f32, text: &str) -> Block {
    let bbox = BoundingBox::new(50.0, y, 550.0, y + 14.0);
    Block::new(role, page, bbox).with_lines(vec![Line::from_spans(vec![
        Span::new(text, bbox).with_font_weight(400.0),
    ])])
}

fn page(number: u32, blocks: Vec<Block>) -> Page {
    let mut page = Page::new(number, BoundingBox::new(0.0, 0.0, 600.0, 800.0));
    for block in blocks {
        page.add_block(block);
    }
    page
}

fn chinese(kind: DocumentKind) -> ReconstructOptions {
    ReconstructOptions::new()
        .with_language(Language::Chinese)
        .with_document_kind(kind)
}

fn heading_levels(structure: &Structure) -> Vec<(String, i32)> {
    structure
        .iter()
        .filter(|el| el.is_heading())
        .map(|el| (el.text.clone(), el.title_level))
        .collect()
}

fn sample_book() -> Vec<Page> {
    vec![
        page(
            0,
            vec![
                text_block(Role::DocTitle, 0, 40.0, "第一章 绪论"),
                text_block(Role::TextTitle, 0, 80.0, "第一节 概述"),
                text_block(Role::Text, 0, 120.0, "糖尿病是一组以高血糖为特征的代谢性疾病。"),
            ],
        ),
        page(
            1,
            vec![
                text_block(Role::Header, 1, 10.0, "第一章 绪论"),
                text_block(Role::TextTitle, 1, 80.0, "第二节 病因"),
                text_block(Role::Text, 1, 120.0, "病因尚未完全阐明。"),
            ],
        ),
    ]
}

#[test]
fn test_numeral_heads_outline() {
    let pages = vec![page(
        0,
        vec![
            text_block(Role::TextTitle, 0, 40.0, "1. 概述"),
            text_block(Role::TextTitle, 0, 80.0, "1.1 背景"),
        ],
    )];
    let structure = reconstruct_with_options(&pages, &chinese(DocumentKind::Guideline)).unwrap();
    assert_eq!(
        heading_levels(&structure),
        vec![("1. 概述".to_string(), 0), ("1.1 背景".to_string(), 1)]
    );
}

#[test]
fn test_outline_run_skipping_parent_stays_flat() {
    let pages = vec![
        page(
            0,
            vec![
                text_block(Role::TextTitle, 0, 40.0, "1.1 背景"),
                text_block(Role::Text, 0, 80.0, "正文内容。"),
                text_block(Role::TextTitle, 0, 120.0, "1.2 目的"),
            ],
        ),
        page(1, vec![text_block(Role::TextTitle, 1, 40.0, "2.1 方法")]),
    ];
    let structure = reconstruct_with_options(&pages, &chinese(DocumentKind::Book)).unwrap();
    let levels: Vec<i32> = heading_levels(&structure).into_iter().map(|(_, l)| l).collect();
    assert_eq!(levels, vec![0, 0, 0]);
}

#[test]
fn test_uncaptioned_table_becomes_table_node() {
    let table_box = BoundingBox::new(50.0, 100.0, 550.0, 300.0);
    let pages = vec![page(
        0,
        vec![
            text_block(Role::Text, 0, 40.0, "The results are listed below."),
            Block::new(Role::Table, 0, table_box).with_html("<table><tr><td>1</td></tr></table>"),
        ],
    )];
    let options = ReconstructOptions::new().with_language(Language::English);
    let structure = reconstruct_with_options(&pages, &options).unwrap();
    let tree = structure.to_tree("report");

    let table = tree
        .json_tree
        .iter()
        .find(|node| matches!(node, Node::Table { .. }))
        .expect("table node");
    match table {
        Node::Table {
            id,
            table_title,
            table_html,
            ..
        } => {
            assert_eq!(id, "0-1");
            assert!(table_title.is_none());
            assert_eq!(table_html, "<table><tr><td>1</td></tr></table>");
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_caption_and_reference_are_linked() {
    let pages = vec![page(
        0,
        vec![
            text_block(Role::TableTitle, 0, 40.0, "Table 2-1 Fasting glucose"),
            Block::new(Role::Table, 0, BoundingBox::new(50.0, 60.0, 550.0, 200.0)).with_html("<table></table>"),
            text_block(Role::Text, 0, 240.0, "As shown in Table 2-1, values rise."),
        ],
    )];
    let options = ReconstructOptions::new().with_language(Language::English);
    let structure = reconstruct_with_options(&pages, &options).unwrap();

    let table = structure.iter().find(|el| el.role == Role::Table).unwrap();
    assert_eq!(
        table.table().and_then(|t| t.title.as_deref()),
        Some("Table 2-1 Fasting glucose")
    );

    let body = structure.iter().find(|el| el.role == Role::Text).unwrap();
    assert_eq!(body.references.len(), 1);
    assert_eq!(body.references[0].id, "0-1");
    assert_eq!(body.references[0].offset, 12);
}

#[test]
fn test_reconstruct_is_deterministic() {
    let pages = sample_book();
    let options = chinese(DocumentKind::Book);
    let first = reconstruct_with_options(&pages, &options).unwrap();
    let second = reconstruct_with_options(&pages, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_markdown(), second.to_markdown());
    assert_eq!(
        serde_json::to_string(&first.to_tree("a")).unwrap(),
        serde_json::to_string(&second.to_tree("a")).unwrap()
    );
}

#[test]
fn test_global_index_strictly_increasing() {
    let structure = reconstruct_with_options(&sample_book(), &chinese(DocumentKind::Book)).unwrap();
    assert!(!structure.is_empty());
    for (position, el) in structure.iter().enumerate() {
        assert_eq!(el.global_index(), position);
    }
}

#[test]
fn test_book_levels_and_running_header() {
    let structure = reconstruct_with_options(&sample_book(), &chinese(DocumentKind::Book)).unwrap();
    assert_eq!(
        heading_levels(&structure),
        vec![
            ("第一章 绪论".to_string(), 0),
            ("第一节 概述".to_string(), 1),
            ("第二节 病因".to_string(), 1),
        ]
    );
    let header = structure.iter().find(|el| el.role == Role::Header).unwrap();
    assert!(!header.informative);

    let markdown = structure.to_markdown();
    assert!(markdown.starts_with("# 第一章 绪论\n\n## 第一节 概述"));
    assert!(markdown.contains("## 第二节 病因\n\n病因尚未完全阐明。"));
}

#[test]
fn test_tree_nests_sections_under_chapter() {
    let structure = reconstruct_with_options(&sample_book(), &chinese(DocumentKind::Book)).unwrap();
    let tree = structure.to_tree("book");
    assert_eq!(tree.file_name, "book");
    assert_eq!(tree.json_tree.len(), 1);

    let chapter = &tree.json_tree[0];
    assert!(matches!(chapter, Node::Title { text, .. } if text == "第一章 绪论"));
    assert_eq!(chapter.children().len(), 2);
    assert!(chapter
        .children()
        .iter()
        .all(|child| matches!(child, Node::Title { elements, .. } if elements.len() == 1)));
}

#[test]
fn test_merge_into_itself_is_noop() {
    let mut structure = reconstruct_with_options(&sample_book(), &chinese(DocumentKind::Book)).unwrap();
    let before = structure[0].text.clone();
    structure.merge_consecutive(0, 0).unwrap();
    assert_eq!(structure[0].text, before);
    assert!(structure[0].informative);
}

#[test]
fn test_load_pages_from_file() {
    let pages = sample_book();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&pages).unwrap().as_bytes())
        .unwrap();

    let loaded = load_pages(file.path()).unwrap();
    assert_eq!(loaded, pages);

    let reconstruction = Unflat::new()
        .with_language(Language::Chinese)
        .with_document_kind(DocumentKind::Book)
        .reconstruct_file(file.path())
        .unwrap();
    let json = reconstruction.to_json(JsonFormat::Compact).unwrap();
    assert!(json.contains("\"type\":\"title\""));
    assert!(json.contains("第二节 病因"));
}

#[test]
fn test_load_pages_reports_bad_input() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{not json").unwrap();
    assert!(matches!(load_pages(file.path()), Err(unflat::Error::Json(_))));
    assert!(matches!(
        load_pages("/nonexistent/pages.json"),
        Err(unflat::Error::Io(_))
    ));
}

#[test]
fn test_reconstruct_many_keeps_order() {
    let documents = vec![
        sample_book(),
        vec![page(0, vec![text_block(Role::Text, 0, 40.0, "Plain text only.")])],
        Vec::new(),
    ];
    let results = reconstruct_many(&documents, &ReconstructOptions::default());
    assert_eq!(results.len(), 3);

    let expected = reconstruct(&documents[0]).unwrap();
    assert_eq!(results[0].as_ref().unwrap(), &expected);
    assert_eq!(results[1].as_ref().unwrap().to_markdown(), "Plain text only.");
    assert!(results[2].as_ref().unwrap().is_empty());
}
