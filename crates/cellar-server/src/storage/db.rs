//! SQLite database for the Cellar server.

cellar_core::define_database!(CellarDatabase, "Cellar database migrations complete");
