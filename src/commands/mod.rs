/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `history`  — List, show, search, delete, and clear stored conversations
- `transfer` — Snapshot export/import and storage usage reporting

These handlers are intentionally small and use the library components:
the conversation repository and the snapshot transfer functions. The
repository instance is constructed by the entry point and passed in by
reference.
*/

pub mod history;
pub mod transfer;
