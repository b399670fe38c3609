use std::backtrace::Backtrace;
use std::time::Instant;
use trendsense::adapter::dual::DualDatabaseAdapter;
use trendsense::adapter::firebase::FirebaseAdapter;
use trendsense::adapter::mock::MockFirebaseAdapter;
use trendsense::config::FirebaseConfig;
use trendsense::doc;
use trendsense::errors::DbResult;
use trendsense::{DatabaseAdapter, Document};

/// Runs a test between its setup and teardown. Teardown also runs when the
/// test body returns an error; panics propagate after teardown is skipped.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> DbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> DbResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> DbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();
    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        let ctx = match before() {
            Ok(ctx) => ctx,
            Err(e) => return Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        };
        match test(ctx.clone()) {
            Ok(_) => after(ctx).map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
            Err(e) => {
                let _ = after(ctx);
                Err((format!("Test failed: {:?}", e), backtrace.to_string()))
            }
        }
    });

    match result {
        Ok(Ok(_)) => {}
        Ok(Err((e, bt))) => {
            eprintln!("\n==================== TEST FAILED ====================");
            eprintln!("Failed after {:?}", start_time.elapsed());
            if !bt.is_empty() && !bt.contains("disabled") {
                eprintln!("\nBacktrace:\n{}", bt);
            }
            eprintln!("=====================================================\n");
            panic!("{}", e);
        }
        Err(panic_err) => std::panic::resume_unwind(panic_err),
    }
}

/// An adapter under test plus, for dual setups, the two stores behind it.
#[derive(Clone)]
pub struct TestContext {
    collection: String,
    adapter: DatabaseAdapter,
    primary: Option<MockFirebaseAdapter>,
    secondary: Option<MockFirebaseAdapter>,
}

impl TestContext {
    pub fn new(adapter: DatabaseAdapter) -> Self {
        Self {
            collection: random_collection(),
            adapter,
            primary: None,
            secondary: None,
        }
    }

    /// A collection name unique to this test.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn adapter(&self) -> DatabaseAdapter {
        self.adapter.clone()
    }

    pub fn primary(&self) -> Option<&MockFirebaseAdapter> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&MockFirebaseAdapter> {
        self.secondary.as_ref()
    }
}

pub fn random_collection() -> String {
    format!("test_{}", uuid::Uuid::new_v4().simple())
}

pub fn create_test_context() -> DbResult<TestContext> {
    let adapter = DatabaseAdapter::new(MockFirebaseAdapter::new());
    adapter.connect()?;
    Ok(TestContext::new(adapter))
}

/// A Firebase adapter without credentials, serving from its fallback store.
pub fn create_firebase_test_context() -> DbResult<TestContext> {
    let config = FirebaseConfig::new().credentials_path("/nonexistent/firebase-credentials.json");
    let adapter = DatabaseAdapter::new(FirebaseAdapter::new(config));
    adapter.connect()?;
    Ok(TestContext::new(adapter))
}

/// A dual adapter over two mock stores.
pub fn create_dual_test_context() -> DbResult<TestContext> {
    let primary = MockFirebaseAdapter::new();
    let secondary = MockFirebaseAdapter::new();
    let dual = DualDatabaseAdapter::new(
        DatabaseAdapter::new(primary.clone()),
        DatabaseAdapter::new(secondary.clone()),
    );
    let adapter = DatabaseAdapter::new(dual);
    adapter.connect()?;

    let mut ctx = TestContext::new(adapter);
    ctx.primary = Some(primary);
    ctx.secondary = Some(secondary);
    Ok(ctx)
}

pub fn cleanup(ctx: TestContext) -> DbResult<()> {
    let adapter = ctx.adapter();
    if adapter.is_connected() {
        adapter.delete_many(ctx.collection(), &trendsense::filter::all())?;
    }
    adapter.disconnect()
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            "name": "Acme Solar",
            "sector": "Energy",
            "esg_score": 82,
            "tags": ["solar", "utility"],
        },
        doc! {
            "name": "Borealis Mining",
            "sector": "Mining",
            "esg_score": 41,
            "tags": ["lithium"],
        },
        doc! {
            "name": "Cobalt Wind",
            "sector": "Energy",
            "esg_score": 67,
            "tags": ["wind"],
        },
        doc! {
            "name": "Delta Retail",
            "sector": "Retail",
            "esg_score": 55,
            "tags": [],
        },
        doc! {
            "name": "Equinox Grid",
            "sector": "Energy",
            "esg_score": 74,
            "tags": ["grid"],
        },
    ]
}
