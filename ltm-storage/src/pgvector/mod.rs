mod provider;
mod schema;

pub use provider::PgVectorProvider;
