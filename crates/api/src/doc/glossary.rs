//! A glossary of terms used in the batchfetch project.
//!
//! ## Batch
//! One invocation of an orchestration strategy over a list of keys. A batch
//! has one [crate::CancellationSignal] and produces one [crate::BatchResult].
//!
//! ## Attempt
//! A single call to [crate::fetch::Fetcher::fetch_one] for one key. Every
//! attempt ends in exactly one [crate::FetchOutcome]. An attempt that is
//! never started because the batch was cancelled first has no outcome.
//!
//! ## Fan-out/fan-in
//! Launching one concurrent attempt per key and joining all of them before
//! the batch completes.
//!
//! ## Backpressure
//! A producer suspending because a bounded buffer is full, rather than
//! dropping entities or buffering without limit.
//!
//! ## Admission gate
//! A counting primitive limiting the number of attempts in flight to K.
//! An attempt takes a slot before it starts and hands it back once it is
//! terminal.
//!
//! ## Affinity thread
//! A single designated thread of control that some sinks require every
//! mutating call to run on, like the event loop of a UI toolkit. See
//! [crate::sink::Sink::requires_affinity].
//!
//! ## Cooperative cancellation
//! Cancellation that only takes effect where code voluntarily checks the
//! signal. Running attempts are never forcibly interrupted. An orchestrator
//! observing cancellation stops issuing attempts and stops waiting for the
//! ones in flight, which then run to completion in the background and have
//! their results discarded. These are called stragglers.
//!
//! ## Legacy drop mode
//! [crate::BatchResult] normally records every failed attempt. With
//! `dropFailures` enabled, failures are logged and discarded instead, which
//! reproduces handlers that only ever fired on success.
