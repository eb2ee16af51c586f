//! Matching mined (date, title) pairs to product blocks
//!
//! Titles are compared in canonical form (see
//! [`canonical_title`](crate::parser::sanitize::canonical_title)). Every mined
//! pair first looks for a textual match; only then do unmatched pairs take the
//! next free block by position. Each block is consumed at most once.

use crate::models::{ConsumedBlocks, MinedTable, RawBlock};
use crate::parser::sanitize::canonical_title;

/// How a mined pair found its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Canonical titles are equal
    Text,
    /// Next free block in document order
    Position,
    /// Blocks ran out
    None,
}

/// One mined pair and the block it was bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// Index into the mined table's entries
    pub mined: usize,
    /// Index into the block list
    pub block: Option<usize>,
    pub kind: MatchKind,
}

/// Bind mined pairs to blocks, in mined order.
///
/// Consumed blocks are recorded in `consumed` by canonical product URL so the
/// date assigner can release and reuse them.
pub fn reconcile(
    blocks: &[RawBlock],
    mined: &MinedTable,
    strip_chars: &str,
    consumed: &mut ConsumedBlocks,
) -> Vec<Reconciled> {
    let block_keys: Vec<String> = blocks
        .iter()
        .map(|b| canonical_title(&b.title, strip_chars))
        .collect();

    let mut result: Vec<Reconciled> = mined
        .entries()
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let key = canonical_title(&pair.key, strip_chars);
            let found = (!key.is_empty())
                .then(|| {
                    blocks.iter().enumerate().position(|(i, block)| {
                        block_keys[i] == key && !consumed.is_consumed(&block.product_url)
                    })
                })
                .flatten();

            match found {
                Some(i) => {
                    consumed.consume(&blocks[i].product_url);
                    Reconciled {
                        mined: index,
                        block: Some(i),
                        kind: MatchKind::Text,
                    }
                }
                None => Reconciled {
                    mined: index,
                    block: None,
                    kind: MatchKind::None,
                },
            }
        })
        .collect();

    let mut cursor = 0;
    for pair in result.iter_mut().filter(|p| p.block.is_none()) {
        while cursor < blocks.len() && consumed.is_consumed(&blocks[cursor].product_url) {
            cursor += 1;
        }
        if cursor == blocks.len() {
            break;
        }
        consumed.consume(&blocks[cursor].product_url);
        pair.block = Some(cursor);
        pair.kind = MatchKind::Position;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionRules;
    use crate::models::MinedDateTitle;
    use chrono::NaiveDate;

    fn block(id: &str, title: &str, position: usize) -> RawBlock {
        RawBlock {
            product_id: id.to_string(),
            href: format!("/tw/zh/ebook/{id}"),
            product_url: format!("https://www.kobo.com/tw/zh/ebook/{id}"),
            title: title.to_string(),
            excerpt: String::new(),
            text: title.to_string(),
            position,
        }
    }

    fn table(titles: &[&str]) -> MinedTable {
        let mut table = MinedTable::new();
        for (i, t) in titles.iter().enumerate() {
            table.insert(MinedDateTitle {
                key: t.to_string(),
                display_title: t.to_string(),
                month: 12,
                day: 20 + i as u32,
                date: NaiveDate::from_ymd_opt(2025, 12, 20 + i as u32).unwrap(),
            });
        }
        table
    }

    fn strip() -> String {
        ExtractionRules::default().canonical_strip_chars
    }

    #[test]
    fn test_text_match_ignores_punctuation() {
        let blocks = vec![block("a", "其他書", 0), block("b", "《破咒師》", 1)];
        let mut consumed = ConsumedBlocks::new();
        let result = reconcile(&blocks, &table(&["破咒師"]), &strip(), &mut consumed);

        assert_eq!(result[0].block, Some(1));
        assert_eq!(result[0].kind, MatchKind::Text);
        assert!(consumed.is_consumed("https://www.kobo.com/tw/zh/ebook/b"));
    }

    #[test]
    fn test_positional_fallback_in_block_order() {
        let blocks = vec![block("a", "甲", 0), block("b", "乙", 1), block("c", "丙", 2)];
        let mut consumed = ConsumedBlocks::new();
        let result = reconcile(&blocks, &table(&["未知一", "丙", "未知二"]), &strip(), &mut consumed);

        assert_eq!(result[0].block, Some(0));
        assert_eq!(result[0].kind, MatchKind::Position);
        assert_eq!(result[1].block, Some(2));
        assert_eq!(result[1].kind, MatchKind::Text);
        assert_eq!(result[2].block, Some(1));
        assert_eq!(consumed.len(), 3);
    }

    #[test]
    fn test_later_text_match_not_starved() {
        // the first pair would take block 0 positionally if matching were greedy
        let blocks = vec![block("a", "乙書", 0), block("b", "丁書", 1)];
        let mut consumed = ConsumedBlocks::new();
        let result = reconcile(&blocks, &table(&["甲書", "乙書"]), &strip(), &mut consumed);

        assert_eq!(result[1].block, Some(0));
        assert_eq!(result[1].kind, MatchKind::Text);
        assert_eq!(result[0].block, Some(1));
    }

    #[test]
    fn test_blocks_exhausted() {
        let blocks = vec![block("a", "甲", 0)];
        let mut consumed = ConsumedBlocks::new();
        let result = reconcile(&blocks, &table(&["x", "y"]), &strip(), &mut consumed);

        assert_eq!(result[0].block, Some(0));
        assert_eq!(result[1].block, None);
        assert_eq!(result[1].kind, MatchKind::None);
    }

    #[test]
    fn test_each_block_used_once() {
        let blocks = vec![block("a", "破咒師", 0)];
        let mut consumed = ConsumedBlocks::new();
        let mut mined = table(&["破咒師"]);
        mined.insert(MinedDateTitle {
            key: "《破咒師》".to_string(),
            display_title: "破咒師".to_string(),
            month: 12,
            day: 28,
            date: NaiveDate::from_ymd_opt(2025, 12, 28).unwrap(),
        });
        let result = reconcile(&blocks, &mined, &strip(), &mut consumed);

        assert_eq!(result[0].block, Some(0));
        assert_eq!(result[1].block, None);
    }
}
