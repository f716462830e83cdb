//! # Nutrivault Documentation
//!
//! Terminal client for a nutrition tracking platform backed by USDA FoodData Central.
//!
//! ## Crates
//! - `catalog`: backend payloads and the HTTP client
//! - `app`: search coordinator, auth context, views and the event loop
//! - `nutrivault-client`: the `nutrivault` binary
//! - `tester`: smoke test against a running backend
//!
//!
//!
//! # General Infrastructure
//! - Backend proxies USDA FoodData Central and keeps users, meals and history in SQLite
//! - Identity is handled by Firebase, the backend only verifies ID tokens
//! - Client talks to the backend over JSON, every body carries a `success` flag
//! - Client talks to Firebase over its REST endpoints, never through the backend
//!
//!
//!
//! # Preventing Rate Limit Exhaustion
//!
//! **Goal**: Stay under the backend limit of 30 searches per minute while still feeling live.
//!
//! - Typed input waits for 1 second of quiet before it is searched
//! - Fewer than 3 characters never reach the backend
//! - The same query twice in a row is searched once
//! - A newer keystroke cancels the request in flight, its result is dropped even if it arrives
//! - A 429 surfaces the backend message and how long to wait, nothing is retried
//!
//!
//!
//! # Notes
//!
//! ## Why a coordinator struct
//! The keystroke handling used to live in closures over shared mutable refs. Here one struct
//! owns the timer deadline, the in flight token and the last searched query, and the event loop
//! is the only thing that touches it. Spawned searches only send completions back.
//!
//! ## Token lifetime
//! Firebase ID tokens last an hour. The client refreshes once a token is within 5 minutes of
//! expiring, so long sessions keep working without signing in again.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! `````
//!
//! Run the client against a local backend.
//! ```sh
//! NUTRIVAULT_API_URL=http://localhost:5003 cargo run -p nutrivault-client
//! ```
//!
//! Enable sign in by providing the Firebase web API key, either as a secret file or variable.
//! ```sh
//! echo "$KEY" > /run/secrets/FIREBASE_API_KEY
//! export FIREBASE_API_KEY="$KEY"
//! ```
//!
//! Smoke test a backend.
//! ```sh
//! cargo run -p tester -- --api-url http://localhost:5003 apple salmon
//! ```
//!
//!
//!
//! # Configuration
//!
//! | Variable | Default | Flag |
//! |---|---|---|
//! | `NUTRIVAULT_API_URL` | `http://localhost:5003` | `--api-url` |
//! | `NUTRIVAULT_TIMEOUT_SECS` | `10` | |
//! | `NUTRIVAULT_DEBOUNCE_MS` | `1000` | `--debounce-ms` |
//! | `NUTRIVAULT_MIN_QUERY_LEN` | `3` | `--min-query-len` |
//! | `NUTRIVAULT_EXPORT_DIR` | `.` | `--export-dir` |
//! | `FIREBASE_API_KEY` | none, sign in disabled | |
//! | `RUST_LOG` | off | |

pub mod user;
