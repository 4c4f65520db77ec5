// ABOUTME: Main library entry point for the Stride training analytics engine
// ABOUTME: Exposes ingestion, aggregation, and recommendation pipelines for the server binary

#![deny(unsafe_code)]

//! # Stride
//!
//! A personal endurance-training analytics engine. For each registered
//! athlete it pulls workout activities from Strava, computes per-activity
//! and per-day training-load metrics (external load in running-equivalent
//! miles, internal load as Banister TRIMP), maintains rolling acute and
//! chronic averages with derived injury-risk ratios, and produces
//! LLM-generated daily and weekly recommendations that are retrospectively
//! graded against what the athlete actually did.
//!
//! ## Architecture
//!
//! - **Providers**: Strava client behind a provider trait
//! - **OAuth**: token lifecycle with per-athlete single-flight refresh
//! - **Ingest**: activity normalization, load model, rest-day coverage
//! - **Intelligence**: TRIMP, HR zones, standard and decayed ACWR engines
//! - **Recommendations**: prompt composition, parsing, autopsy loop
//! - **Sync**: per-athlete pipeline orchestration and scheduled fan-out

/// Environment-driven server configuration
pub mod config;

/// Application constants and physiological coefficients
pub mod constants;

/// Database layer with idempotent migrations
pub mod database;

/// Unified error handling system with standard error codes
pub mod errors;

/// Activity ingestion pipeline
pub mod ingest;

/// Training-load intelligence and ACWR engines
pub mod intelligence;

/// LLM provider abstraction for coaching generation
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Common data models for every persisted table
pub mod models;

/// Provider OAuth token lifecycle
pub mod oauth;

/// Fitness provider implementations
pub mod providers;

/// Recommendation and autopsy pipeline
pub mod recommendations;

/// HTTP routes for the operational surface
pub mod routes;

/// Sync orchestration
pub mod sync;
