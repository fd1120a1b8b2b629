//! Module resolution and the concurrent import cache (C7+C8 of
//! SPEC_FULL.md): a path resolver that classifies dotted names against
//! configured search paths and typeshed-style stub directories, a disk
//! cache contract for previously-scraped compiled modules, the external
//! scrape subprocess, and a process-wide cache that lets overlapping
//! imports of the same module share one in-flight resolution. [`Resolver`]
//! wires all four together behind `pysem_core`'s [`pysem_core::ModuleProvider`]
//! seam, so it's the only type most callers need.

pub mod cache;
pub mod diskcache;
pub mod pathresolver;
pub mod resolver;
pub mod scrape;

pub use crate::{
    cache::{ImportStatus, ModuleCache, ModuleLoader},
    diskcache::DiskCache,
    pathresolver::{PathResolver, ResolvedModule},
    resolver::{Resolver, ResolverConfig},
    scrape::{ScrapeOutcome, scrape},
};
