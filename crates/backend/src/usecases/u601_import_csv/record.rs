//! Нормализованные значения строки и их применение к агрегатам.
//!
//! `None` означает "поля нет в строке": при обновлении такое поле не трогается.

use chrono::NaiveDate;
use contracts::domain::a101_contact::{Contact, ContactId, SocialLinks};
use contracts::domain::a102_deal::{Deal, DealId};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_name: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub social: SocialLinks,
}

impl ContactPatch {
    pub fn create(&self, id: Uuid) -> Contact {
        let mut contact = Contact::new_with_id(ContactId::new(id), self.full_name.clone());
        self.apply(&mut contact);
        contact.mark_imported();
        contact
    }

    pub fn apply(&self, contact: &mut Contact) {
        contact.base.description = self.full_name.clone();
        if self.email.is_some() {
            contact.email = self.email.clone();
        }
        if self.phone.is_some() {
            contact.phone = self.phone.clone();
        }
        if self.position.is_some() {
            contact.position = self.position.clone();
        }
        if self.company_name.is_some() {
            contact.company_name = self.company_name.clone();
        }
        if self.notes.is_some() {
            contact.notes = self.notes.clone();
        }
        if let Some(tags) = &self.tags {
            contact.tags = tags.clone();
        }
        contact.social.merge_from(&self.social);
    }
}

/// Ссылка на этап: существующий или предложенный к созданию по названию
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRef {
    Existing(String),
    Proposed { pipeline_id: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DealPatch {
    pub number: String,
    pub title: String,
    pub amount: f64,
    pub pipeline_id: String,
    pub stage: StageRef,
    pub budget: Option<f64>,
    pub assigned_to_id: Option<String>,
    pub contact_id: Option<String>,
    pub expected_close_at: Option<NaiveDate>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl DealPatch {
    pub fn create(&self, id: Uuid, stage_id: String) -> Deal {
        let mut deal = Deal::new_with_id(
            DealId::new(id),
            self.number.clone(),
            self.title.clone(),
            self.amount,
            self.pipeline_id.clone(),
            stage_id.clone(),
        );
        self.apply(&mut deal, stage_id);
        deal.mark_imported();
        deal
    }

    pub fn apply(&self, deal: &mut Deal, stage_id: String) {
        deal.base.code = self.number.clone();
        deal.base.description = self.title.clone();
        deal.amount = self.amount;
        deal.pipeline_id = self.pipeline_id.clone();
        deal.stage_id = stage_id;
        if self.budget.is_some() {
            deal.budget = self.budget;
        }
        if self.assigned_to_id.is_some() {
            deal.assigned_to_id = self.assigned_to_id.clone();
        }
        if self.contact_id.is_some() {
            deal.contact_id = self.contact_id.clone();
        }
        if self.expected_close_at.is_some() {
            deal.expected_close_at = self.expected_close_at;
        }
        if self.description.is_some() {
            deal.base.comment = self.description.clone();
        }
        if let Some(tags) = &self.tags {
            deal.tags = tags.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowRecord {
    Contact(ContactPatch),
    Deal(DealPatch),
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::domain::common::Origin;

    #[test]
    fn test_contact_update_keeps_absent_fields() {
        let mut existing = Contact::new_for_insert("Старое Имя".into());
        existing.email = Some("old@example.com".into());
        existing.position = Some("Директор".into());
        existing.tags = vec!["vip".into()];

        let patch = ContactPatch {
            full_name: "Новое Имя".into(),
            phone: Some("+79991234567".into()),
            ..Default::default()
        };
        patch.apply(&mut existing);

        assert_eq!(existing.display_name(), "Новое Имя");
        assert_eq!(existing.email.as_deref(), Some("old@example.com"));
        assert_eq!(existing.position.as_deref(), Some("Директор"));
        assert_eq!(existing.phone.as_deref(), Some("+79991234567"));
        assert_eq!(existing.tags, vec!["vip".to_string()]);
    }

    #[test]
    fn test_created_records_are_marked_imported() {
        let id = Uuid::new_v4();
        let contact = ContactPatch { full_name: "Иван".into(), ..Default::default() }.create(id);
        assert_eq!(contact.base.id.value(), id);
        assert_eq!(contact.base.origin, Origin::CsvImport);
    }

    #[test]
    fn test_deal_update_overwrites_required_and_keeps_optional() {
        let mut deal = Deal::new_with_id(DealId::new_v4(), "D-1".into(), "Старая".into(), 10.0, "p1".into(), "s1".into());
        deal.budget = Some(500.0);
        deal.contact_id = Some("c1".into());

        let patch = DealPatch {
            number: "D-1".into(),
            title: "Новая".into(),
            amount: 20.0,
            pipeline_id: "p1".into(),
            stage: StageRef::Existing("s2".into()),
            budget: None,
            assigned_to_id: Some("u1".into()),
            contact_id: None,
            expected_close_at: None,
            description: Some("Комментарий".into()),
            tags: None,
        };
        patch.apply(&mut deal, "s2".into());

        assert_eq!(deal.title(), "Новая");
        assert_eq!(deal.amount, 20.0);
        assert_eq!(deal.stage_id, "s2");
        assert_eq!(deal.budget, Some(500.0));
        assert_eq!(deal.contact_id.as_deref(), Some("c1"));
        assert_eq!(deal.assigned_to_id.as_deref(), Some("u1"));
        assert_eq!(deal.base.comment.as_deref(), Some("Комментарий"));
    }
}
