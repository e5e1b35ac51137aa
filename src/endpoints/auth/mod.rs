pub mod google_verify;
