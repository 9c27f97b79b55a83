use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct SignInQuery {
    pub email: Option<String>,
}

/// Form body of `POST /signin`.
#[derive(Debug, Default, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// What the sign-in page renders.
#[derive(Debug, Serialize)]
pub struct SignInView {
    pub email: String,
    pub csrf_token: Option<String>,
}
