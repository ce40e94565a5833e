//! Tagged query-clause tree
//!
//! Request bodies for the search engine are built from these variants and
//! rendered to the wire format in a single `render` method, so field names,
//! boosts and options are type-checked at construction sites instead of
//! being assembled from loose maps.

use serde_json::{json, Map, Value};

/// One node of a search-engine query
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchAll,
    Term {
        field: String,
        value: Value,
        boost: Option<f64>,
    },
    Prefix {
        field: String,
        value: String,
        boost: Option<f64>,
    },
    Fuzzy {
        field: String,
        value: String,
        prefix_length: u32,
        boost: Option<f64>,
    },
    Match {
        field: String,
        query: String,
        operator: Option<&'static str>,
        fuzziness: Option<&'static str>,
        prefix_length: Option<u32>,
        boost: Option<f64>,
    },
    MatchPhrase {
        field: String,
        query: String,
        boost: Option<f64>,
    },
    MatchPhrasePrefix {
        field: String,
        query: String,
        boost: Option<f64>,
    },
    MultiMatch {
        fields: Vec<String>,
        query: String,
        match_type: &'static str,
        fuzziness: Option<&'static str>,
        boost: Option<f64>,
    },
    Wildcard {
        field: String,
        value: String,
        boost: Option<f64>,
    },
    Bool {
        must: Vec<Clause>,
        should: Vec<Clause>,
        filter: Vec<Clause>,
        minimum_should_match: Option<String>,
        boost: Option<f64>,
    },
    FunctionScore {
        query: Box<Clause>,
        functions: Vec<Value>,
        score_mode: &'static str,
        boost_mode: &'static str,
    },
}

impl Clause {
    pub fn term(field: &str, value: impl Into<Value>, boost: f64) -> Self {
        Clause::Term {
            field: field.to_string(),
            value: value.into(),
            boost: Some(boost),
        }
    }

    pub fn prefix(field: &str, value: &str, boost: f64) -> Self {
        Clause::Prefix {
            field: field.to_string(),
            value: value.to_string(),
            boost: Some(boost),
        }
    }

    pub fn fuzzy(field: &str, value: &str, prefix_length: u32, boost: f64) -> Self {
        Clause::Fuzzy {
            field: field.to_string(),
            value: value.to_string(),
            prefix_length,
            boost: Some(boost),
        }
    }

    pub fn match_query(field: &str, query: &str, boost: f64) -> Self {
        Clause::Match {
            field: field.to_string(),
            query: query.to_string(),
            operator: None,
            fuzziness: None,
            prefix_length: None,
            boost: Some(boost),
        }
    }

    pub fn match_and(field: &str, query: &str, boost: f64) -> Self {
        Clause::Match {
            field: field.to_string(),
            query: query.to_string(),
            operator: Some("and"),
            fuzziness: None,
            prefix_length: None,
            boost: Some(boost),
        }
    }

    pub fn match_fuzzy(field: &str, query: &str, prefix_length: u32, boost: f64) -> Self {
        Clause::Match {
            field: field.to_string(),
            query: query.to_string(),
            operator: None,
            fuzziness: Some("AUTO"),
            prefix_length: Some(prefix_length),
            boost: Some(boost),
        }
    }

    pub fn match_phrase(field: &str, query: &str, boost: f64) -> Self {
        Clause::MatchPhrase {
            field: field.to_string(),
            query: query.to_string(),
            boost: Some(boost),
        }
    }

    pub fn match_phrase_prefix(field: &str, query: &str, boost: f64) -> Self {
        Clause::MatchPhrasePrefix {
            field: field.to_string(),
            query: query.to_string(),
            boost: Some(boost),
        }
    }

    pub fn wildcard(field: &str, value: &str, boost: f64) -> Self {
        Clause::Wildcard {
            field: field.to_string(),
            value: value.to_string(),
            boost: Some(boost),
        }
    }

    pub fn should(clauses: Vec<Clause>, minimum_should_match: Option<String>) -> Self {
        Clause::Bool {
            must: Vec::new(),
            should: clauses,
            filter: Vec::new(),
            minimum_should_match,
            boost: None,
        }
    }

    /// Render this clause tree to the engine's wire format
    pub fn render(&self) -> Value {
        match self {
            Clause::MatchAll => json!({ "match_all": {} }),

            Clause::Term { field, value, boost } => {
                let mut body = Map::new();
                body.insert("value".to_string(), value.clone());
                insert_boost(&mut body, *boost);
                keyed("term", field, body)
            }

            Clause::Prefix { field, value, boost } => {
                let mut body = Map::new();
                body.insert("value".to_string(), json!(value));
                insert_boost(&mut body, *boost);
                keyed("prefix", field, body)
            }

            Clause::Fuzzy {
                field,
                value,
                prefix_length,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("value".to_string(), json!(value));
                body.insert("fuzziness".to_string(), json!("AUTO"));
                body.insert("prefix_length".to_string(), json!(prefix_length));
                insert_boost(&mut body, *boost);
                keyed("fuzzy", field, body)
            }

            Clause::Match {
                field,
                query,
                operator,
                fuzziness,
                prefix_length,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(query));
                if let Some(operator) = operator {
                    body.insert("operator".to_string(), json!(operator));
                }
                if let Some(fuzziness) = fuzziness {
                    body.insert("fuzziness".to_string(), json!(fuzziness));
                }
                if let Some(prefix_length) = prefix_length {
                    body.insert("prefix_length".to_string(), json!(prefix_length));
                }
                insert_boost(&mut body, *boost);
                keyed("match", field, body)
            }

            Clause::MatchPhrase { field, query, boost } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(query));
                insert_boost(&mut body, *boost);
                keyed("match_phrase", field, body)
            }

            Clause::MatchPhrasePrefix { field, query, boost } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(query));
                insert_boost(&mut body, *boost);
                keyed("match_phrase_prefix", field, body)
            }

            Clause::MultiMatch {
                fields,
                query,
                match_type,
                fuzziness,
                boost,
            } => {
                let mut body = Map::new();
                body.insert("query".to_string(), json!(query));
                body.insert("fields".to_string(), json!(fields));
                body.insert("type".to_string(), json!(match_type));
                if let Some(fuzziness) = fuzziness {
                    body.insert("fuzziness".to_string(), json!(fuzziness));
                }
                insert_boost(&mut body, *boost);
                json!({ "multi_match": body })
            }

            Clause::Wildcard { field, value, boost } => {
                let mut body = Map::new();
                body.insert("value".to_string(), json!(value));
                insert_boost(&mut body, *boost);
                keyed("wildcard", field, body)
            }

            Clause::Bool {
                must,
                should,
                filter,
                minimum_should_match,
                boost,
            } => {
                let mut body = Map::new();
                if !must.is_empty() {
                    body.insert("must".to_string(), render_all(must));
                }
                if !should.is_empty() {
                    body.insert("should".to_string(), render_all(should));
                }
                if !filter.is_empty() {
                    body.insert("filter".to_string(), render_all(filter));
                }
                if let Some(msm) = minimum_should_match {
                    body.insert("minimum_should_match".to_string(), json!(msm));
                }
                insert_boost(&mut body, *boost);
                json!({ "bool": body })
            }

            Clause::FunctionScore {
                query,
                functions,
                score_mode,
                boost_mode,
            } => json!({
                "function_score": {
                    "query": query.render(),
                    "functions": functions,
                    "score_mode": score_mode,
                    "boost_mode": boost_mode,
                }
            }),
        }
    }
}

/// Wrap a per-field body as `{ kind: { field: body } }`
fn keyed(kind: &str, field: &str, body: Map<String, Value>) -> Value {
    let mut inner = Map::new();
    inner.insert(field.to_string(), Value::Object(body));
    let mut outer = Map::new();
    outer.insert(kind.to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn render_all(clauses: &[Clause]) -> Value {
    Value::Array(clauses.iter().map(Clause::render).collect())
}

fn insert_boost(body: &mut Map<String, Value>, boost: Option<f64>) {
    if let Some(boost) = boost {
        body.insert("boost".to_string(), json!(boost));
    }
}
