// Property tests for field extraction and aggregation

use proptest::prelude::*;
use top250::analysis::{Analyzer, RATING_BINS};
use top250::parser::{parse_fragment, split_credit_line, split_metadata_line};
use top250::store::{decode_csv, encode_csv};
use top250::types::Record;

fn token() -> impl Strategy<Value = String> {
    "[a-z0-9\u{4e00}-\u{9fa5}]{1,6}"
}

fn record() -> impl Strategy<Value = Record> {
    let field = || "[a-zA-Z0-9 ,\"\n\u{4e00}-\u{9fa5}/·.]{0,12}";
    (
        (field(), field(), field(), field(), field()),
        (field(), field(), field(), field(), field()),
    )
        .prop_map(|((rank, title, director, actors, year), (country, genre, rating, rating_people, quote))| Record {
            rank,
            title,
            director,
            actors,
            year,
            country,
            genre,
            rating,
            rating_people,
            quote,
        })
}

proptest! {
    #[test]
    fn vote_marker_found_at_any_position(fillers in prop::collection::vec("[0-9a-z.]{0,5}", 0..6), position in 0usize..6, votes in 1u32..5_000_000) {
        let position = position.min(fillers.len());
        let mut spans: Vec<String> = fillers.iter().map(|t| format!("<span>{}</span>", t)).collect();
        spans.insert(position, format!("<span>{}人评价</span>", votes));

        let markup = format!(r#"<div class="item"><div class="bd"><div class="star">{}</div></div></div>"#, spans.concat());
        let record = parse_fragment(&markup).unwrap();

        prop_assert_eq!(record.rating_people, votes.to_string());
    }

    #[test]
    fn metadata_tokens_split_into_country_and_genre(tokens in prop::collection::vec(token(), 3..7)) {
        let line = tokens.join(" / ");
        let (year, country, genre) = split_metadata_line(&line);

        prop_assert_eq!(year, tokens[0].clone());
        prop_assert_eq!(country, Some(tokens[1].clone()));
        prop_assert_eq!(genre, Some(tokens[2..].join(" ")));
    }

    #[test]
    fn unlabelled_credit_line_is_all_director(line in "[A-Za-z\u{4e00}-\u{9fa5}][A-Za-z ·\u{4e00}-\u{9fa5}]{0,20}[A-Za-z\u{4e00}-\u{9fa5}]") {
        let (director, actors) = split_credit_line(&line);

        prop_assert_eq!(director, line);
        prop_assert_eq!(actors, None);
    }

    #[test]
    fn every_parseable_rating_lands_in_one_bin(tenths in prop::collection::vec(0u32..=100, 0..40)) {
        let records: Vec<Record> = tenths
            .iter()
            .map(|t| Record { rating: format!("{:.1}", *t as f64 / 10.0), ..Default::default() })
            .collect();

        let distribution = Analyzer::new(&records).rating_distribution();

        prop_assert_eq!(distribution.len(), RATING_BINS.len());
        prop_assert_eq!(distribution.total(), records.len());
    }

    #[test]
    fn csv_round_trip_preserves_records(records in prop::collection::vec(record(), 1..8)) {
        let decoded = decode_csv(&encode_csv(&records).unwrap()).unwrap();
        prop_assert_eq!(decoded, records);
    }
}

#[test]
fn boundary_ratings_count_in_the_higher_bin() {
    let cases = [("9.0", "9.0-10.0"), ("8.5", "8.5-8.9"), ("8.0", "8.0-8.4"), ("7.5", "7.5-7.9"), ("7.0", "7.0-7.4")];

    for (rating, label) in cases {
        let records = vec![Record { rating: rating.to_string(), ..Default::default() }];
        let distribution = Analyzer::new(&records).rating_distribution();
        assert_eq!(distribution.get(label), Some(1), "rating {} should count in {}", rating, label);
    }
}
