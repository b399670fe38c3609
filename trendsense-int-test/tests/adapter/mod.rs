mod aggregate_test;
mod crud_test;
mod firebase_fallback_test;
