//! # sqlgraph core
//!
//! This crate is the engine behind the `sqlgraph` server. It introspects a
//! relational database, builds an in-memory [`catalog`] of its tables,
//! synthesizes a typed GraphQL schema from that catalog ([`gql`]), and
//! compiles GraphQL arguments into parameterized SQL ([`sql`]) which the
//! [`exe`] layer runs against a [`dbs::Storage`] implementation.
//!
//! A poll-based change [`feed`] is layered on top of the executor and backs
//! the generated subscription fields.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod catalog;
pub mod cnf;
pub mod dbs;
pub mod err;
pub mod exe;
pub mod feed;
pub mod gql;
pub mod path;
pub mod sql;
pub mod val;
