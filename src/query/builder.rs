//! Request-body construction for the search engine
//!
//! `build_search_body` renders a validated [`SearchSpec`] into the engine's
//! request body: the multi-strategy boolean query, multiplicative scoring
//! functions, a top-N rescore pass, highlighting and the sort table.
//! `build_autocomplete_body` renders the completion-suggester request with
//! its secondary product query, and `merge_autocomplete` folds the two
//! result streams into one deduplicated suggestion list.

use crate::backend::SearchOutcome;
use crate::query::clause::Clause;
use crate::query::{SearchSpec, Sort, Suggestion, SuggestionKind};
use serde_json::{json, Value};

/// Engine-side search deadline carried inside the request body
const BODY_TIMEOUT: &str = "15s";

/// Name of the completion-suggester section in autocomplete requests
const SUGGEST_SECTION: &str = "product-suggest";

/// Source fields returned on hits
const SOURCE_FIELDS: [&str; 22] = [
    "product_id",
    "external_id",
    "sku",
    "name",
    "description",
    "brand_id",
    "brand_name",
    "series_id",
    "series_name",
    "unit",
    "dimensions",
    "min_sale",
    "weight",
    "popularity_score",
    "in_stock",
    "categories",
    "category_ids",
    "attributes",
    "images",
    "documents",
    "created_at",
    "updated_at",
];

/// Catalog identifier predicate: alphanumeric with dash/dot/slash,
/// at least one digit, at most 50 characters
pub fn is_code(q: &str) -> bool {
    !q.is_empty()
        && q.chars().count() <= 50
        && q.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '/'))
        && q.chars().any(|c| c.is_ascii_digit())
}

/// Build the full search request body for a validated spec
pub fn build_search_body(spec: &SearchSpec, rescore_window: u32) -> Value {
    let mut body = json!({
        "size": spec.limit,
        "from": spec.offset(),
        "track_total_hits": true,
        "timeout": BODY_TIMEOUT,
        "_source": SOURCE_FIELDS,
    });

    let filters = filter_clauses(spec);

    if spec.q.is_empty() {
        let query = if filters.is_empty() {
            Clause::MatchAll
        } else {
            Clause::Bool {
                must: vec![Clause::MatchAll],
                should: Vec::new(),
                filter: filters,
                minimum_should_match: None,
                boost: None,
            }
        };
        body["query"] = query.render();
    } else {
        let mut main = main_query(&spec.q);
        if !filters.is_empty() {
            main = Clause::Bool {
                must: vec![main],
                should: Vec::new(),
                filter: filters,
                minimum_should_match: None,
                boost: None,
            };
        }

        let scored = Clause::FunctionScore {
            query: Box::new(main),
            functions: scoring_functions(),
            score_mode: "sum",
            boost_mode: "multiply",
        };
        body["query"] = scored.render();
        body["highlight"] = highlight_block();
        body["rescore"] = rescore_block(&spec.q, rescore_window);
    }

    body["sort"] = sort_block(spec.sort, !spec.q.is_empty());
    body
}

/// The multi-strategy `should` query. Each clause contributes its boost to
/// `_score`; one match suffices.
fn main_query(q: &str) -> Clause {
    let code = is_code(q);
    let words: Vec<&str> = q.split_whitespace().collect();

    let mut should = Vec::with_capacity(12);

    if code {
        should.push(Clause::term("external_id.keyword", q, 1000.0));
        should.push(Clause::term("sku.keyword", q, 900.0));
    }
    should.push(Clause::prefix("external_id", q, 100.0));
    should.push(Clause::prefix("sku", q, 90.0));
    should.push(Clause::fuzzy("external_id", q, 2, 80.0));
    should.push(Clause::match_phrase("name", q, 70.0));
    should.push(Clause::match_and("name", q, 60.0));
    should.push(Clause::match_fuzzy("name", q, 3, 40.0));
    should.push(Clause::MultiMatch {
        fields: vec![
            "name^5".to_string(),
            "name.ngram^2".to_string(),
            "brand_name^3".to_string(),
            "series_name^2".to_string(),
            "description".to_string(),
        ],
        query: q.to_string(),
        match_type: "best_fields",
        fuzziness: Some("AUTO"),
        boost: Some(30.0),
    });

    if words.len() > 1 {
        let word_clauses: Vec<Clause> = words
            .iter()
            .filter(|w| w.chars().count() >= 2)
            .map(|w| Clause::MultiMatch {
                fields: vec![
                    "name^3".to_string(),
                    "brand_name^2".to_string(),
                    "description".to_string(),
                ],
                query: (*w).to_string(),
                match_type: "best_fields",
                fuzziness: None,
                boost: None,
            })
            .collect();
        let required = ((0.7 * words.len() as f64).ceil()) as usize;
        should.push(Clause::Bool {
            must: Vec::new(),
            should: word_clauses,
            filter: Vec::new(),
            minimum_should_match: Some(required.to_string()),
            boost: Some(20.0),
        });
    }

    should.push(Clause::match_query("name.ngram", q, 10.0));

    if q.chars().count() >= 3 && !code {
        should.push(Clause::wildcard("name.keyword", &format!("*{}*", q), 5.0));
    }

    Clause::should(should, Some("1".to_string()))
}

fn filter_clauses(spec: &SearchSpec) -> Vec<Clause> {
    let mut filters = Vec::new();
    if let Some(brand) = &spec.filters.brand_name {
        filters.push(Clause::Term {
            field: "brand_name.keyword".to_string(),
            value: json!(brand),
            boost: None,
        });
    }
    if let Some(series) = &spec.filters.series_name {
        filters.push(Clause::Term {
            field: "series_name.keyword".to_string(),
            value: json!(series),
            boost: None,
        });
    }
    if let Some(category) = &spec.filters.category {
        filters.push(Clause::Term {
            field: "categories".to_string(),
            value: json!(category),
            boost: None,
        });
    }
    filters
}

/// Multiplicative score factors: popularity, availability and two
/// length-based dampeners
fn scoring_functions() -> Vec<Value> {
    vec![
        json!({
            "field_value_factor": {
                "field": "popularity_score",
                "factor": 1.2,
                "modifier": "log1p",
                "missing": 0,
            },
            "weight": 10,
        }),
        json!({
            "filter": { "term": { "in_stock": true } },
            "weight": 5,
        }),
        json!({
            "script_score": {
                "script": {
                    "source": "double len = doc['name.keyword'].size() > 0 ? doc['name.keyword'].value.length() : 50; return Math.max(1.0, 50.0 - len) / 50.0;",
                }
            },
            "weight": 3,
        }),
        json!({
            "script_score": {
                "script": {
                    "source": "if (doc['description'].size() == 0) { return 1.0; } double len = doc['description'].value.length(); return Math.max(0.5, 1.0 - len / 1000.0);",
                }
            },
            "weight": 2,
        }),
    ]
}

fn rescore_block(q: &str, window: u32) -> Value {
    let rescore_query = Clause::should(
        vec![
            Clause::match_phrase("name", q, 10.0),
            Clause::match_and("name", q, 5.0),
        ],
        None,
    );

    json!({
        "window_size": window,
        "query": {
            "query_weight": 0.7,
            "rescore_query_weight": 1.3,
            "rescore_query": rescore_query.render(),
        }
    })
}

fn highlight_block() -> Value {
    json!({
        "pre_tags": ["<mark>"],
        "post_tags": ["</mark>"],
        "fields": {
            "name": { "number_of_fragments": 0 },
            "external_id": { "number_of_fragments": 0 },
            "sku": { "number_of_fragments": 0 },
            "description": { "number_of_fragments": 1, "fragment_size": 150 },
        }
    })
}

fn sort_block(sort: Sort, has_query: bool) -> Value {
    match sort {
        Sort::Relevance if has_query => json!([
            { "_score": "desc" },
            { "popularity_score": "desc" },
        ]),
        Sort::Relevance => json!([
            { "popularity_score": "desc" },
            { "name.keyword": "asc" },
        ]),
        Sort::Name => json!([{ "name.keyword": "asc" }]),
        Sort::ExternalId => json!([{ "external_id.keyword": "asc" }]),
        Sort::Availability => json!([
            { "in_stock": "desc" },
            { "_score": "desc" },
        ]),
        Sort::Popularity => json!([
            { "popularity_score": "desc" },
            { "_score": "desc" },
        ]),
        // No price field is indexed yet; product_id stands in until the
        // dynamic-data source is canonicalized.
        Sort::PriceAsc => json!([{ "product_id": "asc" }]),
        Sort::PriceDesc => json!([{ "product_id": "desc" }]),
    }
}

/// Build the autocomplete request: a completion suggester plus a secondary
/// product query over prefix/phrase-prefix/fuzzy strategies
pub fn build_autocomplete_body(q: &str, limit: u32) -> Value {
    let secondary = Clause::should(
        vec![
            Clause::prefix("external_id", q, 10.0),
            Clause::prefix("name.autocomplete", q, 5.0),
            Clause::match_phrase_prefix("name", q, 3.0),
            Clause::fuzzy("name", q, 1, 2.0),
            Clause::prefix("brand_name.autocomplete", q, 2.0),
        ],
        Some("1".to_string()),
    );

    json!({
        "size": limit,
        "_source": ["name", "external_id"],
        "suggest": {
            SUGGEST_SECTION: {
                "prefix": q,
                "completion": {
                    "field": "suggest",
                    "size": limit,
                    "fuzzy": {
                        "fuzziness": "AUTO",
                        "prefix_length": 1,
                    }
                }
            }
        },
        "query": secondary.render(),
    })
}

/// Merge completion-suggester options and secondary query hits into one
/// list: deduplicated case-insensitively with completion entries first,
/// sorted by score descending, truncated to `limit`
pub fn merge_autocomplete(outcome: &SearchOutcome, limit: u32) -> Vec<Suggestion> {
    let mut merged: Vec<Suggestion> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    if let Some(options) = outcome
        .suggest
        .as_ref()
        .and_then(|s| s.get(SUGGEST_SECTION))
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get("options"))
        .and_then(Value::as_array)
    {
        for option in options {
            let Some(text) = option.get("text").and_then(Value::as_str) else {
                continue;
            };
            let key = text.to_lowercase();
            if text.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            merged.push(Suggestion {
                text: text.to_string(),
                kind: SuggestionKind::Suggest,
                score: option.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
                external_id: None,
            });
        }
    }

    for hit in &outcome.hits {
        let Some(name) = hit.source.get("name").and_then(Value::as_str) else {
            continue;
        };
        let key = name.to_lowercase();
        if name.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(Suggestion {
            text: name.to_string(),
            kind: SuggestionKind::Product,
            score: hit.score.unwrap_or(0.0),
            external_id: hit
                .source
                .get("external_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        });
    }

    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(limit as usize);
    merged
}
