//! Property tests for listing order and payload decoding

use dizipal_core::parser::stream::{decode_hex_digits, decode_hex_escapes};
use dizipal_core::parser::{default_strategies, extract_stream_url, parse_listing};
use proptest::prelude::*;

const PAGE: &str = "https://dizipal953.com/diziler";

/// (has_title, has_link) per tile
fn tiles() -> impl Strategy<Value = Vec<(bool, bool)>> {
    prop::collection::vec((any::<bool>(), any::<bool>()), 0..24)
}

fn listing_html(tiles: &[(bool, bool)]) -> String {
    let items: String = tiles
        .iter()
        .enumerate()
        .map(|(i, (has_title, has_link))| {
            let title = if *has_title {
                format!(r#"<span class="title">Title {}</span>"#, i)
            } else {
                String::new()
            };
            let href = if *has_link {
                format!("/dizi/title-{}", i)
            } else {
                String::new()
            };
            format!(r#"<li><a href="{}"><img src="/p/{}.jpg">{}</a></li>"#, href, i, title)
        })
        .collect();

    format!(r#"<html><body><article class="type2"><ul>{}</ul></article></body></html>"#, items)
}

proptest! {
    #[test]
    fn listing_keeps_order_of_complete_tiles(tiles in tiles()) {
        let html = listing_html(&tiles);

        let expected: Vec<String> = tiles
            .iter()
            .enumerate()
            .filter(|(_, (has_title, has_link))| *has_title && *has_link)
            .map(|(i, _)| format!("Title {}", i))
            .collect();

        let actual: Vec<String> = parse_listing(&html, PAGE)
            .into_iter()
            .map(|entry| entry.title)
            .collect();

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn hex_digits_with_foreign_char_never_decode(
        prefix in "[0-9a-f]{0,20}",
        bad in "[g-zG-Z!#%&*+;=?@]",
        suffix in "[0-9a-f]{0,20}",
    ) {
        let payload = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(decode_hex_digits(&payload).is_err());
    }

    #[test]
    fn odd_hex_digit_count_never_decodes(digits in "[0-9a-f]{0,40}") {
        let payload = if digits.len() % 2 == 0 {
            format!("{}a", digits)
        } else {
            digits
        };
        prop_assert!(decode_hex_digits(&payload).is_err());
    }

    #[test]
    fn escape_groups_of_wrong_width_never_decode(group in "[0-9a-f]{3,6}|[0-9a-f]") {
        let payload = format!(r"\x68\x74{}\x74\x70", format!(r"\x{}", group));
        prop_assert!(decode_hex_escapes(&payload).is_err());
    }

    #[test]
    fn strategy_chain_never_panics(page in ".{0,400}") {
        let _ = extract_stream_url(&page, &default_strategies());
    }
}
