//! Typed request/response example for HTTPS callable Functions.
//! Shows how to map Rust structs to JSON payloads without manual serialization code at call sites.

use firebase_rs_functions::functions::{Functions, FunctionsSettings};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct AddRequest {
    a: i64,
    b: i64,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    sum: i64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let functions = Functions::new(FunctionsSettings {
        project_id: Some("your-project-id".into()),
        region_or_custom_domain: Some("europe-west1".into()),
    })?;
    let add = functions.https_callable_typed::<AddRequest, AddResponse>("addNumbers")?;

    let response = add.call(&AddRequest { a: 5, b: 7 }).await?;
    println!("5 + 7 = {}", response.sum);

    Ok(())
}
