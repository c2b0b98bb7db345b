//! Partial-update resolution.
//!
//! Merges a patch into an existing record field by field: absent keeps,
//! null clears, a value overwrites. id and created_at are never touched;
//! updated_at always advances.

use crm_core::{
    next_write_time, Company, CompanyPatch, Contact, ContactPatch, Deal, DealPatch, Record, Task,
    TaskPatch, Timestamp, ValidationError,
};

/// Records that accept a partial update.
pub trait Resolve: Record + Sized {
    type Patch;

    /// Produce the full record that results from applying `patch` at `now`.
    fn resolve(self, patch: Self::Patch, now: Timestamp) -> Result<Self, ValidationError>;
}

impl Resolve for Company {
    type Patch = CompanyPatch;

    fn resolve(mut self, patch: CompanyPatch, now: Timestamp) -> Result<Self, ValidationError> {
        patch.name.apply_required(&mut self.name, "name")?;
        patch.industry.apply(&mut self.industry);
        patch.website.apply(&mut self.website);
        patch.phone.apply(&mut self.phone);
        patch.email.apply(&mut self.email);
        patch.address.apply(&mut self.address);
        self.updated_at = next_write_time(self.updated_at, now);
        Ok(self)
    }
}

impl Resolve for Contact {
    type Patch = ContactPatch;

    fn resolve(mut self, patch: ContactPatch, now: Timestamp) -> Result<Self, ValidationError> {
        patch
            .first_name
            .apply_required(&mut self.first_name, "first_name")?;
        patch
            .last_name
            .apply_required(&mut self.last_name, "last_name")?;
        patch.email.apply(&mut self.email);
        patch.phone.apply(&mut self.phone);
        patch.job_title.apply(&mut self.job_title);
        patch.company_id.apply(&mut self.company_id);
        self.updated_at = next_write_time(self.updated_at, now);
        Ok(self)
    }
}

impl Resolve for Deal {
    type Patch = DealPatch;

    fn resolve(mut self, patch: DealPatch, now: Timestamp) -> Result<Self, ValidationError> {
        patch.title.apply_required(&mut self.title, "title")?;
        patch.description.apply(&mut self.description);
        patch.value.apply_required(&mut self.value, "value")?;
        patch.stage.apply_required(&mut self.stage, "stage")?;
        patch
            .contact_id
            .apply_required(&mut self.contact_id, "contact_id")?;
        patch
            .company_id
            .apply_required(&mut self.company_id, "company_id")?;
        patch.expected_close_date.apply(&mut self.expected_close_date);
        self.updated_at = next_write_time(self.updated_at, now);
        Ok(self)
    }
}

impl Resolve for Task {
    type Patch = TaskPatch;

    fn resolve(mut self, patch: TaskPatch, now: Timestamp) -> Result<Self, ValidationError> {
        patch.title.apply_required(&mut self.title, "title")?;
        patch.description.apply(&mut self.description);
        patch.completed.apply_required(&mut self.completed, "completed")?;
        patch.due_date.apply(&mut self.due_date);
        patch.contact_id.apply(&mut self.contact_id);
        patch.company_id.apply(&mut self.company_id);
        patch.deal_id.apply(&mut self.deal_id);
        self.updated_at = next_write_time(self.updated_at, now);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crm_core::{now, DealStage, Decimal, Patch};

    fn sample_company() -> Company {
        let ts = now() - Duration::minutes(5);
        Company {
            id: 1,
            name: "Acme".to_string(),
            industry: Some("Tech".to_string()),
            website: Some("https://acme.test".to_string()),
            phone: None,
            email: Some("info@acme.com".to_string()),
            address: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn sample_deal() -> Deal {
        let ts = now();
        Deal {
            id: 3,
            title: "Expansion".to_string(),
            description: Some("Phase two".to_string()),
            value: Decimal::new(5_000_000, 2),
            stage: DealStage::Won,
            contact_id: 1,
            company_id: 1,
            expected_close_date: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_absent_fields_are_preserved() {
        let company = sample_company();
        let patch = CompanyPatch {
            name: Patch::Value("Acme Inc".to_string()),
            ..CompanyPatch::default()
        };
        let resolved = company.clone().resolve(patch, now()).unwrap();

        assert_eq!(resolved.name, "Acme Inc");
        assert_eq!(resolved.industry, company.industry);
        assert_eq!(resolved.website, company.website);
        assert_eq!(resolved.email, company.email);
        assert_eq!(resolved.id, company.id);
        assert_eq!(resolved.created_at, company.created_at);
        assert!(resolved.updated_at > company.updated_at);
    }

    #[test]
    fn test_null_clears_nullable_field() {
        let patch = CompanyPatch {
            industry: Patch::Null,
            ..CompanyPatch::default()
        };
        let resolved = sample_company().resolve(patch, now()).unwrap();
        assert_eq!(resolved.industry, None);
        assert_eq!(resolved.name, "Acme");
    }

    #[test]
    fn test_null_on_required_field_is_rejected() {
        let patch = DealPatch {
            title: Patch::Null,
            ..DealPatch::default()
        };
        let err = sample_deal().resolve(patch, now()).unwrap_err();
        assert_eq!(err.field(), "title");
    }

    #[test]
    fn test_empty_patch_still_advances_updated_at() {
        let deal = sample_deal();
        // Same instant as the stored timestamp: the clock has not moved.
        let resolved = deal
            .clone()
            .resolve(DealPatch::default(), deal.updated_at)
            .unwrap();
        assert!(resolved.updated_at > deal.updated_at);
        assert_eq!(
            Deal {
                updated_at: deal.updated_at,
                ..resolved
            },
            deal
        );
    }

    #[test]
    fn test_stage_moves_backwards_freely() {
        let patch = DealPatch {
            stage: Patch::Value(DealStage::NewLead),
            ..DealPatch::default()
        };
        let resolved = sample_deal().resolve(patch, now()).unwrap();
        assert_eq!(resolved.stage, DealStage::NewLead);
    }

    #[test]
    fn test_task_fk_cleared_by_null() {
        let ts = now();
        let task = Task {
            id: 1,
            title: "Call".to_string(),
            description: None,
            completed: false,
            due_date: None,
            contact_id: Some(2),
            company_id: Some(3),
            deal_id: Some(4),
            created_at: ts,
            updated_at: ts,
        };
        let patch = TaskPatch {
            deal_id: Patch::Null,
            completed: Patch::Value(true),
            ..TaskPatch::default()
        };
        let resolved = task.resolve(patch, now()).unwrap();
        assert_eq!(resolved.deal_id, None);
        assert_eq!(resolved.contact_id, Some(2));
        assert!(resolved.completed);
    }
}
