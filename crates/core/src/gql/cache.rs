use tokio::sync::RwLock;

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::exe::Executor;

use super::SchemaOptions;
use super::error::GqlError;
use super::schema::{SynthesizedSchema, generate_schema};

#[async_trait::async_trait]
pub trait Invalidator: Debug + Clone + Send + Sync + 'static {
	type MetaData: Debug + Clone + Send + Sync;

	fn is_valid(token: Option<&str>, meta: &Self::MetaData) -> bool;

	async fn generate(
		exe: &Executor,
		options: &SchemaOptions,
	) -> Result<(SynthesizedSchema, Self::MetaData), GqlError>;
}

/// Rebuilds the schema for every request.
#[derive(Debug, Clone, Copy)]
pub struct Pessimistic;

#[async_trait::async_trait]
impl Invalidator for Pessimistic {
	type MetaData = ();

	fn is_valid(_token: Option<&str>, _meta: &Self::MetaData) -> bool {
		false
	}

	async fn generate(
		exe: &Executor,
		options: &SchemaOptions,
	) -> Result<(SynthesizedSchema, Self::MetaData), GqlError> {
		let schema = generate_schema(exe.catalog().await?, options)?;
		Ok((schema, ()))
	}
}

/// Keeps the schema until the storage reports a different version token.
///
/// A storage without a version token gets a fresh schema for every request.
#[derive(Debug, Clone, Copy)]
pub struct Versioned;

#[async_trait::async_trait]
impl Invalidator for Versioned {
	type MetaData = Option<String>;

	fn is_valid(token: Option<&str>, meta: &Self::MetaData) -> bool {
		token.is_some() && token == meta.as_deref()
	}

	async fn generate(
		exe: &Executor,
		options: &SchemaOptions,
	) -> Result<(SynthesizedSchema, Self::MetaData), GqlError> {
		let catalog = exe.catalog().await?;
		let token = catalog.token().map(str::to_owned);
		let schema = generate_schema(catalog, options)?;
		Ok((schema, token))
	}
}

#[derive(Clone)]
pub struct SchemaCache<I: Invalidator = Versioned> {
	inner: Arc<RwLock<Option<(Arc<SynthesizedSchema>, I::MetaData)>>>,
	pub exe: Executor,
	options: SchemaOptions,
	_invalidator: PhantomData<I>,
}

impl<I: Invalidator + Debug> Debug for SchemaCache<I> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache")
			.field("options", &self.options)
			.field("_invalidator", &self._invalidator)
			.finish_non_exhaustive()
	}
}

impl<I: Invalidator> SchemaCache<I> {
	pub fn new(exe: Executor, options: SchemaOptions) -> Self {
		SchemaCache {
			inner: Default::default(),
			exe,
			options,
			_invalidator: PhantomData,
		}
	}

	pub fn options(&self) -> &SchemaOptions {
		&self.options
	}

	/// The current schema, rebuilt if the database schema changed.
	///
	/// The cached schema is replaced as a whole, so a caller holds either
	/// the previous or the new schema and never a mix of both. If the
	/// database cannot be introspected, a previously built schema is served.
	pub async fn get_schema(&self) -> Result<Arc<SynthesizedSchema>, GqlError> {
		let token = match self.exe.store().version().await {
			Ok(token) => token,
			Err(e) => return self.fallback(e.into()).await,
		};
		if token.is_none() {
			warn!("The storage reported no schema version, the schema will be rebuilt for every request");
		}
		{
			let guard = self.inner.read().await;
			if let Some((schema, meta)) = guard.as_ref() {
				if I::is_valid(token.as_deref(), meta) {
					return Ok(schema.clone());
				}
			}
		};

		let (schema, meta) = match I::generate(&self.exe, &self.options).await {
			Ok(generated) => generated,
			Err(e) => return self.fallback(e).await,
		};
		let schema = Arc::new(schema);
		debug!(token = ?token, "Rebuilt the GraphQL schema");

		{
			let mut guard = self.inner.write().await;
			*guard = Some((schema.clone(), meta));
		}

		Ok(schema)
	}

	async fn fallback(&self, err: GqlError) -> Result<Arc<SynthesizedSchema>, GqlError> {
		if let GqlError::DbError(crate::err::Error::SchemaIntrospection(_)) = &err {
			if let Some((schema, _)) = self.inner.read().await.as_ref() {
				warn!("Serving the previous schema: {err}");
				return Ok(schema.clone());
			}
		}
		Err(err)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};

	use super::*;
	use crate::catalog::ColumnInfo;
	use crate::dbs::{SqliteStore, Statement, Storage};
	use crate::err::{Error, Result};
	use crate::val::Row;

	/// A store whose introspection can be switched off.
	struct Flaky {
		inner: SqliteStore,
		broken: AtomicBool,
	}

	#[async_trait::async_trait]
	impl Storage for Flaky {
		fn kind(&self) -> &'static str {
			"flaky"
		}

		async fn version(&self) -> Result<Option<String>> {
			self.inner.version().await
		}

		async fn introspect(&self) -> Result<Vec<ColumnInfo>> {
			if self.broken.load(Ordering::SeqCst) {
				return Err(Error::SchemaIntrospection("disk on fire".into()));
			}
			self.inner.introspect().await
		}

		async fn query(&self, stm: &Statement) -> Result<Vec<Row>> {
			self.inner.query(stm).await
		}

		async fn transaction(&self, stms: &[Statement]) -> Result<Vec<Vec<Row>>> {
			self.inner.transaction(stms).await
		}
	}

	async fn exe() -> (Executor, Arc<Flaky>) {
		let store = Arc::new(Flaky {
			inner: SqliteStore::open("memory").unwrap(),
			broken: AtomicBool::new(false),
		});
		let exe = Executor::new(store.clone());
		exe.raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)").await.unwrap();
		(exe, store)
	}

	#[test_log::test(tokio::test)]
	async fn same_token_returns_the_same_schema() {
		let (exe, _) = exe().await;
		let cache = SchemaCache::<Versioned>::new(exe, SchemaOptions::default());
		let a = cache.get_schema().await.unwrap();
		let b = cache.get_schema().await.unwrap();
		assert!(Arc::ptr_eq(&a, &b));
		assert!(Arc::ptr_eq(a.table_types("users").unwrap(), b.table_types("users").unwrap()));
	}

	#[test_log::test(tokio::test)]
	async fn changed_token_rebuilds_the_schema() {
		let (exe, _) = exe().await;
		let cache = SchemaCache::<Versioned>::new(exe.clone(), SchemaOptions::default());
		let a = cache.get_schema().await.unwrap();
		assert!(a.table_types("posts").is_none());
		exe.raw("CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT)").await.unwrap();
		let b = cache.get_schema().await.unwrap();
		assert!(!Arc::ptr_eq(&a, &b));
		assert!(b.table_types("posts").is_some());
	}

	#[test_log::test(tokio::test)]
	async fn pessimistic_always_rebuilds() {
		let (exe, _) = exe().await;
		let cache = SchemaCache::<Pessimistic>::new(exe, SchemaOptions::default());
		let a = cache.get_schema().await.unwrap();
		let b = cache.get_schema().await.unwrap();
		assert!(!Arc::ptr_eq(&a, &b));
	}

	#[test_log::test(tokio::test)]
	async fn introspection_failure_serves_the_previous_schema() {
		let (exe, store) = exe().await;
		let cache = SchemaCache::<Pessimistic>::new(exe, SchemaOptions::default());
		assert!(cache.get_schema().await.is_ok());
		store.broken.store(true, Ordering::SeqCst);
		let served = cache.get_schema().await.unwrap();
		assert!(served.table_types("users").is_some());
	}

	#[test_log::test(tokio::test)]
	async fn introspection_failure_without_a_schema_is_an_error() {
		let (exe, store) = exe().await;
		store.broken.store(true, Ordering::SeqCst);
		let cache = SchemaCache::<Versioned>::new(exe, SchemaOptions::default());
		assert!(cache.get_schema().await.is_err());
	}
}
