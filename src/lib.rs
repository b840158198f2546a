//! Pull configured git repositories and push their files into dependent bots.

pub mod updater;
