//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`, so finds return them
//! in insertion order exactly like the SQLite backend's rowid order.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Parallel, SearchTicket, StopwordList, Text, Unit};

use super::{DeleteResult, InsertResult, Store, TextQuery, UnitQuery, UpdateResult};

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    texts: RwLock<Vec<Text>>,
    units: RwLock<Vec<Unit>>,
    tickets: RwLock<Vec<SearchTicket>>,
    stopwords: RwLock<BTreeMap<String, Vec<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_texts(&self, query: &TextQuery) -> Result<Vec<Text>> {
        let texts = self.texts.read().map_err(poisoned)?;
        Ok(texts.iter().filter(|t| query.matches(t)).cloned().collect())
    }

    async fn insert_texts(&self, new: &[Text]) -> Result<InsertResult> {
        let mut texts = self.texts.write().map_err(poisoned)?;
        let mut inserted_ids = Vec::new();
        for text in new {
            if texts.iter().any(|t| t.cts_urn == text.cts_urn) {
                continue;
            }
            texts.push(text.clone());
            inserted_ids.push(text.cts_urn.clone());
        }
        Ok(InsertResult { inserted_ids })
    }

    async fn update_text(&self, text: &Text) -> Result<UpdateResult> {
        let mut texts = self.texts.write().map_err(poisoned)?;
        let matched_count = match texts.iter_mut().find(|t| t.cts_urn == text.cts_urn) {
            Some(stored) => {
                *stored = text.clone();
                1
            }
            None => 0,
        };
        Ok(UpdateResult { matched_count })
    }

    async fn delete_text(&self, cts_urn: &str) -> Result<DeleteResult> {
        let mut texts = self.texts.write().map_err(poisoned)?;
        let before = texts.len();
        texts.retain(|t| t.cts_urn != cts_urn);
        Ok(DeleteResult {
            deleted_count: (before - texts.len()) as u64,
        })
    }

    async fn find_units(&self, query: &UnitQuery) -> Result<Vec<Unit>> {
        let units = self.units.read().map_err(poisoned)?;
        Ok(units
            .iter()
            .filter(|u| u.text == query.text && u.unit_type == query.unit_type)
            .cloned()
            .collect())
    }

    async fn insert_units(&self, new: &[Unit]) -> Result<InsertResult> {
        let mut units = self.units.write().map_err(poisoned)?;
        units.extend_from_slice(new);
        Ok(InsertResult {
            inserted_ids: new.iter().map(|u| u.cts_urn.clone()).collect(),
        })
    }

    async fn insert_ticket(&self, ticket: &SearchTicket) -> Result<InsertResult> {
        let mut tickets = self.tickets.write().map_err(poisoned)?;
        if tickets.iter().any(|t| t.id == ticket.id) {
            return Ok(InsertResult::default());
        }
        tickets.push(ticket.clone());
        Ok(InsertResult {
            inserted_ids: vec![ticket.id.clone()],
        })
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<SearchTicket>> {
        let tickets = self.tickets.read().map_err(poisoned)?;
        Ok(tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn complete_ticket(&self, id: &str, parallels: &[Parallel]) -> Result<UpdateResult> {
        let mut tickets = self.tickets.write().map_err(poisoned)?;
        let matched_count = match tickets.iter_mut().find(|t| t.id == id && !t.is_ready()) {
            Some(ticket) => {
                ticket.parallels = Some(parallels.to_vec());
                1
            }
            None => 0,
        };
        Ok(UpdateResult { matched_count })
    }

    async fn pending_ticket_ids(&self) -> Result<Vec<String>> {
        let tickets = self.tickets.read().map_err(poisoned)?;
        let mut pending: Vec<&SearchTicket> = tickets.iter().filter(|t| !t.is_ready()).collect();
        pending.sort_by_key(|t| t.created_at);
        Ok(pending.into_iter().map(|t| t.id.clone()).collect())
    }

    async fn stopword_list_names(&self) -> Result<Vec<String>> {
        let lists = self.stopwords.read().map_err(poisoned)?;
        Ok(lists.keys().cloned().collect())
    }

    async fn find_stopword_list(&self, name: &str) -> Result<Option<StopwordList>> {
        let lists = self.stopwords.read().map_err(poisoned)?;
        Ok(lists.get(name).map(|stopwords| StopwordList {
            name: name.to_string(),
            stopwords: stopwords.clone(),
        }))
    }

    async fn upsert_stopword_list(&self, list: &StopwordList) -> Result<UpdateResult> {
        let mut lists = self.stopwords.write().map_err(poisoned)?;
        lists.insert(list.name.clone(), list.stopwords.clone());
        Ok(UpdateResult { matched_count: 1 })
    }

    async fn delete_stopword_list(&self, name: &str) -> Result<DeleteResult> {
        let mut lists = self.stopwords.write().map_err(poisoned)?;
        Ok(DeleteResult {
            deleted_count: u64::from(lists.remove(name).is_some()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::YearRange;

    fn text(urn: &str, year: i64) -> Text {
        Text {
            cts_urn: urn.to_string(),
            author: "vergil".to_string(),
            title: "aeneid".to_string(),
            language: "latin".to_string(),
            is_prose: false,
            year,
            path: format!("/{urn}.tess"),
            extra: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_skipped() {
        let store = InMemoryStore::new();
        let first = store.insert_texts(&[text("urn:cts:a:b", 1)]).await.unwrap();
        assert_eq!(first.inserted_ids, vec!["urn:cts:a:b"]);
        let second = store.insert_texts(&[text("urn:cts:a:b", 2)]).await.unwrap();
        assert!(second.inserted_ids.is_empty());
        let found = store.find_texts(&TextQuery::by_urn("urn:cts:a:b")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].year, 1);
    }

    #[tokio::test]
    async fn test_find_texts_keeps_insertion_order() {
        let store = InMemoryStore::new();
        store
            .insert_texts(&[text("urn:cts:a:z", 3), text("urn:cts:a:a", 1)])
            .await
            .unwrap();
        let query = TextQuery {
            years: vec![YearRange { low: 0, high: 10 }],
            ..Default::default()
        };
        let urns: Vec<String> = store
            .find_texts(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.cts_urn)
            .collect();
        assert_eq!(urns, vec!["urn:cts:a:z", "urn:cts:a:a"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_report_counts() {
        let store = InMemoryStore::new();
        let mut t = text("urn:cts:a:b", 1);
        assert_eq!(store.update_text(&t).await.unwrap().matched_count, 0);
        store.insert_texts(&[t.clone()]).await.unwrap();
        t.title = "georgics".to_string();
        assert_eq!(store.update_text(&t).await.unwrap().matched_count, 1);
        assert_eq!(store.delete_text("urn:cts:a:b").await.unwrap().deleted_count, 1);
        assert_eq!(store.delete_text("urn:cts:a:b").await.unwrap().deleted_count, 0);
    }
}
