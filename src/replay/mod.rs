//! # Multicast replay
//!
//! [`MulticastReplay`] subscribes once to an upstream producer, transforms each value,
//! caches the result and fans it out to any number of downstream observers. A late
//! subscriber first receives the whole cache, then live values, with no gap and no
//! duplicate; if the upstream already terminated it also receives the terminal signal.
//!
//! ```text
//!  upstream ── on_next(v) ──► transform(v) ─► cache.push(u) ─► live[0..n].on_next(u)
//!                                                 │
//!  subscribe(obs) ── replay cache[0..] ───────────┘ then attach to live (or deliver terminal)
//! ```

mod multicast;
mod slots;

pub use multicast::{MulticastReplay, Transform};
