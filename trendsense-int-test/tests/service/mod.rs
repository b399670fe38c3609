mod migration_test;
mod service_test;
