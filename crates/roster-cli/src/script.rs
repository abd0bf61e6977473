//! Operation scripts: the JSON model replayed by the CLI.

use std::fs;
use std::path::Path;

use anyhow::Context;
use roster_backend::{KeyedBackend, ListResult};
use roster_list::{ListConfig, RosterList, SyncSummary};
use roster_store::{InMemorySharedStore, Shareable};
use roster_types::Keyed;
use serde::{Deserialize, Serialize};

/// A list entry: a string key plus an arbitrary JSON value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: serde_json::Value,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Keyed for Record {
    type Key = String;

    fn key(&self) -> String {
        self.key.clone()
    }
}

impl Shareable for Record {
    type Store = InMemorySharedStore<Record>;
}

fn one() -> usize {
    1
}

/// One step of a script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Insert {
        pos: usize,
        items: Vec<Record>,
    },
    Push {
        item: Record,
    },
    Remove {
        pos: usize,
        #[serde(default = "one")]
        count: usize,
    },
    RemoveKeys {
        keys: Vec<String>,
    },
    Replace {
        pos: usize,
        item: Record,
    },
    Reset {
        #[serde(default)]
        items: Option<Vec<Record>>,
    },
    ReplaceReset {
        items: Vec<Record>,
    },
    Sync {
        items: Vec<Record>,
    },
    Extend {
        items: Vec<Record>,
    },
    SetHasMore {
        has_more: bool,
    },
    FetchMore,
}

/// What a successful step reported back.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Count { count: usize },
    Synced(SyncSummary),
    Fetch { requested: bool },
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Done => write!(f, "ok"),
            Outcome::Count { count } => write!(f, "{count} affected"),
            Outcome::Synced(s) => write!(
                f,
                "{} updated, {} removed, {} inserted",
                s.updated, s.removed, s.inserted
            ),
            Outcome::Fetch { requested: true } => write!(f, "fetch requested"),
            Outcome::Fetch { requested: false } => write!(f, "nothing more to fetch"),
        }
    }
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Insert { .. } => "insert",
            Op::Push { .. } => "push",
            Op::Remove { .. } => "remove",
            Op::RemoveKeys { .. } => "remove_keys",
            Op::Replace { .. } => "replace",
            Op::Reset { .. } => "reset",
            Op::ReplaceReset { .. } => "replace_reset",
            Op::Sync { .. } => "sync",
            Op::Extend { .. } => "extend",
            Op::SetHasMore { .. } => "set_has_more",
            Op::FetchMore => "fetch_more",
        }
    }

    /// Run this step against `list`.
    pub fn apply<B>(self, list: &mut RosterList<B>) -> ListResult<Outcome>
    where
        B: KeyedBackend<Item = Record>,
    {
        let outcome = match self {
            Op::Insert { pos, items } => Outcome::Count {
                count: list.insert(pos, items)?,
            },
            Op::Push { item } => Outcome::Count {
                count: list.push(item)?,
            },
            Op::Remove { pos, count } => {
                list.remove_range(pos, count)?;
                Outcome::Count { count }
            }
            Op::RemoveKeys { keys } => Outcome::Count {
                count: list.remove_if(|record| keys.contains(&record.key))?,
            },
            Op::Replace { pos, item } => {
                list.replace(pos, item)?;
                Outcome::Done
            }
            Op::Reset { items } => Outcome::Count {
                count: list.reset_with(items)?,
            },
            Op::ReplaceReset { items } => {
                list.replace_reset(items)?;
                Outcome::Done
            }
            Op::Sync { items } => Outcome::Synced(list.sync(items)?),
            Op::Extend { items } => Outcome::Count {
                count: list.extend(items)?,
            },
            Op::SetHasMore { has_more } => {
                list.set_has_more(has_more);
                Outcome::Done
            }
            Op::FetchMore => Outcome::Fetch {
                requested: list.fetch_more(),
            },
        };
        Ok(outcome)
    }
}

pub fn load_script(path: &Path) -> anyhow::Result<Vec<Op>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid script {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ListConfig> {
    let Some(path) = path else {
        return Ok(ListConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_list::VecMapList;
    use serde_json::json;

    #[test]
    fn parse_every_op() {
        let ops: Vec<Op> = serde_json::from_value(json!([
            {"op": "insert", "pos": 0, "items": [{"key": "a", "value": 1}]},
            {"op": "push", "item": {"key": "b", "value": "two"}},
            {"op": "remove", "pos": 1},
            {"op": "remove_keys", "keys": ["a"]},
            {"op": "replace", "pos": 0, "item": {"key": "a", "value": null}},
            {"op": "reset"},
            {"op": "replace_reset", "items": []},
            {"op": "sync", "items": []},
            {"op": "extend", "items": []},
            {"op": "set_has_more", "has_more": true},
            {"op": "fetch_more"}
        ]))
        .unwrap();
        assert_eq!(ops.len(), 11);
        assert_eq!(ops[2], Op::Remove { pos: 1, count: 1 });
        assert_eq!(ops[5], Op::Reset { items: None });
        let names: Vec<&str> = ops.iter().map(Op::name).collect();
        assert_eq!(names[3], "remove_keys");
        assert_eq!(names[10], "fetch_more");
    }

    #[test]
    fn unknown_op_is_rejected() {
        let result: Result<Vec<Op>, _> = serde_json::from_value(json!([{"op": "shuffle"}]));
        assert!(result.is_err());
    }

    #[test]
    fn apply_remove_keys() {
        let mut list: VecMapList<Record> = RosterList::new();
        list.insert(
            0,
            vec![Record::new("a", 1), Record::new("b", 2), Record::new("c", 3)],
        )
        .unwrap();
        let outcome = Op::RemoveKeys {
            keys: vec!["a".into(), "c".into()],
        }
        .apply(&mut list)
        .unwrap();
        assert_eq!(outcome, Outcome::Count { count: 2 });
        assert_eq!(list.to_vec().unwrap(), vec![Record::new("b", 2)]);
    }

    #[test]
    fn outcome_display() {
        let synced = Outcome::Synced(SyncSummary {
            updated: 1,
            removed: 2,
            inserted: 3,
        });
        assert_eq!(synced.to_string(), "1 updated, 2 removed, 3 inserted");
        assert_eq!(Outcome::Count { count: 4 }.to_string(), "4 affected");
    }

    #[test]
    fn load_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");
        fs::write(&path, r#"[{"op": "fetch_more"}]"#).unwrap();
        assert_eq!(load_script(&path).unwrap(), vec![Op::FetchMore]);
    }

    #[test]
    fn load_script_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_script(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn load_config_defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), ListConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, r#"{"has_more": true, "fetch_batch": 10}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert!(config.has_more);
        assert_eq!(config.fetch_batch, 10);
    }
}
