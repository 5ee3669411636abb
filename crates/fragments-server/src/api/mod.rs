// ABOUTME: API module containing the HTTP handler functions for the fragments REST API.
// ABOUTME: Fragment CRUD and on-read conversion live in the fragments sub-module.

pub mod fragments;
