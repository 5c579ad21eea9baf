//! A poll-based feed of rows newly inserted into a table.
//!
//! Each feed owns the set of primary keys it has already delivered. Every
//! poll lists the keys currently in the table, fetches the rows whose keys
//! were not seen before, and grows the seen set. Updates and deletes are not
//! detected. A failed poll closes the feed, and the stream ends once it has
//! reported the failure or once its consumer drops it.

use std::collections::HashSet;
use std::time::Duration;

use futures::Stream;
use tokio::time::{Interval, MissedTickBehavior};

use crate::catalog::Table;
use crate::cnf::FEED_POLL_INTERVAL_MS;
use crate::err::{Error, Result, compilation};
use crate::exe::Executor;
use crate::sql::{Direction, Filter, OrderBy, Select};
use crate::val::{Row, Value};

/// How many keys are bound into a single fetch of new rows.
const FETCH_BATCH_SIZE: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedState {
	/// The feed polls its table for new rows.
	Polling,
	/// A poll failed, the feed delivers nothing more.
	Closed,
}

pub struct ChangeFeed {
	exe: Executor,
	table: Table,
	pk: String,
	seen: HashSet<Value>,
	interval: Duration,
	skip_existing: bool,
	primed: bool,
	state: FeedState,
}

impl ChangeFeed {
	/// Creates a feed over a table with a primary key.
	pub fn new(exe: Executor, table: Table) -> Result<ChangeFeed> {
		let pk = table
			.primary_key()
			.map(|c| c.name.clone())
			.ok_or_else(|| compilation(format!("table `{}` has no primary key", table.name)))?;
		Ok(ChangeFeed {
			exe,
			table,
			pk,
			seen: HashSet::new(),
			interval: Duration::from_millis(*FEED_POLL_INTERVAL_MS),
			skip_existing: false,
			primed: false,
			state: FeedState::Polling,
		})
	}

	/// Sets the delay between two polls.
	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	/// Only delivers rows inserted after the first poll.
	pub fn from_tail(mut self, skip_existing: bool) -> Self {
		self.skip_existing = skip_existing;
		self
	}

	pub fn state(&self) -> FeedState {
		self.state
	}

	/// Polls the table once, returning the rows not delivered before.
	///
	/// An error closes the feed, later polls fail without querying.
	pub async fn poll(&mut self) -> Result<Option<Vec<Row>>> {
		if self.state == FeedState::Closed {
			return Err(Error::Internal(format!(
				"the change feed of table `{}` is closed",
				self.table.name
			)));
		}
		let res = self.fetch().await;
		if res.is_err() {
			self.state = FeedState::Closed;
		}
		res
	}

	async fn fetch(&mut self) -> Result<Option<Vec<Row>>> {
		let keys = self.exe.keys(&self.table).await?;
		let mut fresh = Vec::new();
		for key in keys {
			if !self.seen.contains(&key) {
				fresh.push(key);
			}
		}
		if !self.primed {
			self.primed = true;
			if self.skip_existing {
				self.seen.extend(fresh);
				return Ok(None);
			}
		}
		if fresh.is_empty() {
			return Ok(None);
		}
		debug!("Found {} new rows in table `{}`", fresh.len(), self.table.name);
		let mut rows = Vec::with_capacity(fresh.len());
		for chunk in fresh.chunks(FETCH_BATCH_SIZE) {
			let mut sel = Select::new(Filter::within(self.pk.clone(), chunk.to_vec()));
			sel.order = OrderBy(vec![(self.pk.clone(), Direction::Asc)]);
			rows.extend(self.exe.select(&self.table, &sel).await?);
		}
		self.seen.extend(fresh);
		Ok(Some(rows))
	}

	/// Turns the feed into a stream of row batches, polling on an interval.
	///
	/// The stream yields the first error, then ends.
	pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Row>>> + Send {
		let init: (ChangeFeed, Option<Interval>) = (self, None);
		futures::stream::unfold(init, |(mut feed, ticker)| async move {
			if feed.state == FeedState::Closed {
				return None;
			}
			let mut ticker = ticker.unwrap_or_else(|| {
				let mut ticker = tokio::time::interval(feed.interval);
				ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
				ticker
			});
			loop {
				ticker.tick().await;
				match feed.poll().await {
					Ok(Some(rows)) => return Some((Ok(rows), (feed, Some(ticker)))),
					Ok(None) => continue,
					Err(e) => {
						warn!("Closing the change feed of table `{}`: {e}", feed.table.name);
						return Some((Err(e), (feed, Some(ticker))));
					}
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use futures::StreamExt;

	use super::*;
	use crate::dbs::SqliteStore;

	async fn setup() -> (Executor, Table) {
		let exe = Executor::new(Arc::new(SqliteStore::open("memory").unwrap()));
		exe.raw("CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT)").await.unwrap();
		exe.raw("INSERT INTO events (kind) VALUES ('boot')").await.unwrap();
		let table = exe.catalog().await.unwrap().table("events").cloned().unwrap();
		(exe, table)
	}

	#[test_log::test(tokio::test)]
	async fn delivers_each_new_row_once() {
		let (exe, table) = setup().await;
		let mut feed = ChangeFeed::new(exe.clone(), table).unwrap();
		let first = feed.poll().await.unwrap().unwrap();
		assert_eq!(first.len(), 1);
		assert_eq!(feed.poll().await.unwrap(), None);
		exe.raw("INSERT INTO events (kind) VALUES ('click')").await.unwrap();
		let next = feed.poll().await.unwrap().unwrap();
		assert_eq!(next.len(), 1);
		assert_eq!(next[0]["kind"], Value::from("click"));
		assert_eq!(feed.poll().await.unwrap(), None);
		assert_eq!(feed.state(), FeedState::Polling);
	}

	#[test_log::test(tokio::test)]
	async fn tail_feeds_skip_existing_rows() {
		let (exe, table) = setup().await;
		let mut feed = ChangeFeed::new(exe.clone(), table).unwrap().from_tail(true);
		assert_eq!(feed.poll().await.unwrap(), None);
		exe.raw("INSERT INTO events (kind) VALUES ('click')").await.unwrap();
		let rows = feed.poll().await.unwrap().unwrap();
		assert_eq!(rows[0]["id"], Value::Integer(2));
	}

	#[test_log::test(tokio::test)]
	async fn streams_batches_on_an_interval() {
		let (exe, table) = setup().await;
		let feed = ChangeFeed::new(exe.clone(), table)
			.unwrap()
			.with_interval(Duration::from_millis(10));
		let mut stream = Box::pin(feed.into_stream());
		let first = stream.next().await.unwrap().unwrap();
		assert_eq!(first[0]["kind"], Value::from("boot"));
		exe.raw("INSERT INTO events (kind) VALUES ('click')").await.unwrap();
		let next = stream.next().await.unwrap().unwrap();
		assert_eq!(next.len(), 1);
		assert_eq!(next[0]["kind"], Value::from("click"));
	}

	#[test_log::test(tokio::test)]
	async fn failed_polls_close_the_feed() {
		let (exe, table) = setup().await;
		let mut feed = ChangeFeed::new(exe.clone(), table).unwrap();
		assert!(feed.poll().await.unwrap().is_some());
		exe.raw("DROP TABLE events").await.unwrap();
		assert!(feed.poll().await.is_err());
		assert_eq!(feed.state(), FeedState::Closed);
		// The table is back, but a closed feed stays closed
		exe.raw("CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT)").await.unwrap();
		assert!(matches!(feed.poll().await, Err(Error::Internal(_))));
		let mut stream = Box::pin(feed.into_stream());
		assert!(stream.next().await.is_none());
	}

	#[test_log::test(tokio::test)]
	async fn streams_end_after_reporting_a_failure() {
		let (exe, table) = setup().await;
		let feed = ChangeFeed::new(exe.clone(), table).unwrap().with_interval(Duration::from_millis(10));
		exe.raw("DROP TABLE events").await.unwrap();
		let mut stream = Box::pin(feed.into_stream());
		assert!(stream.next().await.unwrap().is_err());
		assert!(stream.next().await.is_none());
	}

	#[test]
	fn tables_without_a_primary_key_are_rejected() {
		let table = crate::catalog::Catalog::build(
			None,
			vec![crate::catalog::ColumnInfo {
				table_name: "log".into(),
				column_name: "line".into(),
				column_type: "TEXT".into(),
				..Default::default()
			}],
		)
		.table("log")
		.cloned()
		.unwrap();
		let exe = Executor::new(Arc::new(SqliteStore::open("memory").unwrap()));
		assert!(ChangeFeed::new(exe, table).is_err());
	}
}
