// CLI module for deckfeed
//
// Command-line front end over the library: run the source server, inspect
// recorded streams, or act as a test source.

pub mod commands;
pub mod config;
pub mod output;
