#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Kitchen Shelves
//!
//! > **Perishable orders, bounded shelves, and the couriers who race the clock.**
//!
//! This crate simulates a kitchen that receives perishable orders, keeps them on
//! capacity-bounded shelves while they decay, and hands them to couriers who arrive
//! after a random delay. Orders that decay to zero freshness are thrown away.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Explicit State, Shared by Handle
//!
//! Nothing in the crate is global. The shelves live in one [`ShelfAllocator`](shelf::ShelfAllocator),
//! the counters in one [`Stats`](stats::Stats), and both are built by the
//! orchestrator and handed out as `Arc`s. A test builds its own fresh set in one line.
//!
//! ### Time and Chance Are Inputs
//!
//! Freshness depends on elapsed time and courier arrival is random. Both come in through
//! traits ([`Clock`](clock::Clock), [`DelaySource`](pipeline::DelaySource)), so tests
//! replace them with [`ManualClock`](clock::ManualClock) and
//! [`FixedDelay`](pipeline::FixedDelay) and run deterministically.
//!
//! ## 🚀 Core Concepts
//!
//! ### Freshness
//! An order's freshness is recomputed from its creation instant whenever it is needed:
//!
//! ```text
//! freshness = (shelf_life - decay_rate * age_seconds * decay_modifier) / shelf_life
//! ```
//!
//! `decay_modifier` belongs to the order's own class, not to the shelf it sits on:
//! orders of class `any` decay twice as fast, and a hot order moved onto overflow
//! keeps decaying at the hot rate.
//!
//! ### The Placement Cascade
//! An order goes to its own shelf if there is room, otherwise to overflow. When overflow
//! is full too, misplaced overflow orders are moved home where possible, and as a last
//! resort the oldest overflow order is discarded. See [`shelf::allocator`].
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each module defines its own error type (e.g., `QueueError`, `AllocationError`) with `thiserror`.
//! Errors local to one order never stop a worker: they are counted, logged, and the worker moves on.
//!
//! ### 2. Concurrency Model
//! Two fixed worker pools (processing and dispatch) consume two independent queues.
//! Each shelf synchronizes on its own, so placements and pickups on different shelves
//! never contend.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured logging.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data ([`model`])
//! - **Key items**: [`Order`](model::Order), [`ShelfClass`](model::ShelfClass).
//!
//! ### 2. The Shelves ([`shelf`])
//! - **Role**: Bounded concurrent storage, placement, pickup and expiry.
//! - **Key items**: [`Shelf`](shelf::Shelf), [`ShelfAllocator`](shelf::ShelfAllocator), [`Reclaimer`](shelf::Reclaimer).
//!
//! ### 3. The Plumbing ([`queue`], [`pipeline`])
//! - **Role**: Moves orders from the ingestion point to the worker pools.
//! - **Key items**: [`OrderQueue`](queue::OrderQueue), [`Intake`](pipeline::Intake), [`WorkerPool`](pipeline::WorkerPool).
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! - **Role**: Spins up every task, wires them together and shuts them down.
//! - **Key items**: [`KitchenSystem`](lifecycle::KitchenSystem), [`ServiceConfig`](config::ServiceConfig).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Replay an orders file with info logs
//! RUST_LOG=info cargo run -- --orders orders.json
//!
//! # Generate 200 synthetic orders at 5 per second
//! cargo run -- --generate 200 --rate 5
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod shelf;
pub mod stats;
