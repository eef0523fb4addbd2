//! Table skeleton filling from the public parser API.

use unflat::parser::{match_cells, match_in_order, CellFragment};
use unflat::BoundingBox;

fn grid_skeleton(rows: usize, cols: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    for _ in 0..rows {
        tokens.push("<tr>".to_string());
        for _ in 0..cols {
            tokens.push("<td>[]</td>".to_string());
        }
        tokens.push("</tr>".to_string());
    }
    tokens
}

fn fragments(count: usize, cols: usize) -> Vec<CellFragment> {
    (0..count)
        .map(|i| {
            let (row, col) = ((i / cols.max(1)) as f32, (i % cols.max(1)) as f32);
            CellFragment::new(
                format!("c{}", i),
                BoundingBox::new(col * 60.0, row * 20.0, col * 60.0 + 60.0, row * 20.0 + 20.0),
            )
        })
        .collect()
}

fn unresolved(tokens: &[String]) -> usize {
    tokens.iter().filter(|t| t.contains("[]")).count()
}

fn cells(tokens: &[String]) -> usize {
    tokens.iter().filter(|t| t.ends_with("</td>")).count()
}

#[test]
fn test_two_by_two_with_dropped_cell() {
    let frags = vec![
        CellFragment::new("Drug", BoundingBox::new(0.0, 0.0, 60.0, 20.0)),
        CellFragment::new("Dose", BoundingBox::new(60.0, 0.0, 120.0, 20.0)),
        CellFragment::new("Metformin", BoundingBox::new(0.0, 20.0, 60.0, 40.0)),
    ];
    let result = match_cells(&grid_skeleton(2, 2), &frags);

    assert!(result.trusted);
    assert_eq!(
        result.body(),
        "<tr><td>Drug</td><td>Dose</td></tr><tr><td>Metformin</td><td></td></tr>"
    );
    assert!(result.to_html().contains("<table frame=\"hsides\""));
}

#[test]
fn test_every_placeholder_resolved() {
    for rows in 0..4 {
        for cols in 0..4 {
            let skeleton = grid_skeleton(rows, cols);
            for count in 0..(rows * cols + 3) {
                let result = match_cells(&skeleton, &fragments(count, cols));
                assert_eq!(unresolved(&result.tokens), 0, "{}x{} with {}", rows, cols, count);
                assert_eq!(cells(&result.tokens), rows * cols);
                assert_eq!(result.tokens.len(), skeleton.len());
            }
        }
    }
}

#[test]
fn test_in_order_fill_is_untrusted() {
    let skeleton = grid_skeleton(1, 3);
    let result = match_in_order(&skeleton, &fragments(2, 3));
    assert!(!result.trusted);
    assert_eq!(result.body(), "<tr><td>c0</td><td>c1</td><td></td></tr>");
}
