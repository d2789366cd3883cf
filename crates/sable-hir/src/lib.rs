//! Method-body IR consumed by the flow analyses in `sable-flow`.
//!
//! Parsing and name binding happen upstream: a front end lowers one
//! method/constructor body at a time into the arena tree defined here, with
//! every identifier already resolved to an entry of the body's symbol table.
//! This crate only defines that shape (and a builder for producing it); it
//! runs no analysis of its own.

pub mod body;
