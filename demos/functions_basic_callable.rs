//! Minimal Functions example invoking a callable with a JSON payload.
//! Provide your Firebase project ID and deploy a callable named `helloWorld` (or adjust the name).
//! Set `FUNCTIONS_EMULATOR_PORT` to target a local emulator instead.

use std::time::Duration;

use firebase_rs_functions::functions::{Functions, FunctionsSettings};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Uses the default region (us-central1).
    let functions = Functions::new(FunctionsSettings {
        project_id: Some("your-project-id".into()),
        ..Default::default()
    })?;

    if let Ok(port) = std::env::var("FUNCTIONS_EMULATOR_PORT") {
        functions.use_functions_emulator("127.0.0.1", port.parse()?);
    }

    let callable = functions.https_callable("helloWorld")?;
    callable.set_timeout(Duration::from_secs(15));

    let response = callable.call(Some(json!({ "message": "Hello from Rust!" }))).await?;
    println!("Callable response: {}", response.data());

    Ok(())
}
