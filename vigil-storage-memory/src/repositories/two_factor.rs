use async_trait::async_trait;
use dashmap::DashMap;
use vigil_core::{Error, PrincipalId, TwoFactorEnrollment, repositories::TwoFactorRepository};

/// Two-factor enrollments keyed by principal.
#[derive(Default)]
pub struct MemoryTwoFactorRepository {
    enrollments: DashMap<String, TwoFactorEnrollment>,
}

impl MemoryTwoFactorRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TwoFactorRepository for MemoryTwoFactorRepository {
    async fn upsert(&self, enrollment: TwoFactorEnrollment) -> Result<(), Error> {
        self.enrollments
            .insert(enrollment.principal_id.to_string(), enrollment);
        Ok(())
    }

    async fn get(&self, principal_id: &PrincipalId) -> Result<Option<TwoFactorEnrollment>, Error> {
        Ok(self
            .enrollments
            .get(principal_id.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn delete(&self, principal_id: &PrincipalId) -> Result<(), Error> {
        self.enrollments.remove(principal_id.as_str());
        Ok(())
    }
}
