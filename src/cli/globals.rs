use secrecy::SecretString;

#[derive(Clone)]
pub struct GlobalArgs {
    pub admin_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(admin_secret: SecretString) -> Self {
        Self { admin_secret }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("admin_secret", &"***")
            .finish()
    }
}
