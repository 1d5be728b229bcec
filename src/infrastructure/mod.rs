pub mod remotes;
