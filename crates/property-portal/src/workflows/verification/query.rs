use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use super::domain::{ApplicantProfile, KindScope, VerificationStatus};
use super::error::{ValidationError, VerificationError};
use super::store::ApplicantStore;

/// Listing filter shared by interactive queries and exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationFilter {
    pub status: Option<VerificationStatus>,
    pub search_text: Option<String>,
}

impl VerificationFilter {
    pub fn with_status(status: VerificationStatus) -> Self {
        Self {
            status: Some(status),
            search_text: None,
        }
    }

    pub fn with_search(search_text: impl Into<String>) -> Self {
        Self {
            status: None,
            search_text: Some(search_text.into()),
        }
    }

    fn needle(&self) -> Option<String> {
        self.search_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    FirstName,
    LastName,
    Email,
    Status,
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "firstName" | "first_name" => Ok(SortField::FirstName),
            "lastName" | "last_name" => Ok(SortField::LastName),
            "email" => Ok(SortField::Email),
            "status" | "verificationStatus" => Ok(SortField::Status),
            _ => Err(ValidationError::InvalidSortField(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError::InvalidSortOrder(raw.to_string())),
        }
    }
}

/// Listing order. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortSpec {
    /// Total order: the requested field first, then kind and id ascending, so paging is
    /// deterministic even when the sort key ties.
    fn compare(&self, left: &ApplicantProfile, right: &ApplicantProfile) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => left.created_at.cmp(&right.created_at),
            SortField::FirstName => compare_text(&left.first_name, &right.first_name),
            SortField::LastName => compare_text(&left.last_name, &right.last_name),
            SortField::Email => compare_text(&left.email, &right.email),
            SortField::Status => left
                .verification_status()
                .cmp(&right.verification_status()),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };

        primary
            .then_with(|| left.kind.cmp(&right.kind))
            .then_with(|| left.id.cmp(&right.id))
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(usize),
    Unbounded,
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: PageSize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size: PageSize::Limited(page_size),
        }
    }

    /// Everything on a single page; used by exports.
    pub fn unbounded() -> Self {
        Self {
            page: 1,
            page_size: PageSize::Unbounded,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::InvalidPage);
        }
        if self.page_size == PageSize::Limited(0) {
            return Err(ValidationError::InvalidPageSize);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    pub items: Vec<ApplicantProfile>,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

/// Filterable, paginated listing over one kind or all three.
pub struct VerificationQueryEngine<S> {
    store: Arc<S>,
}

impl<S> VerificationQueryEngine<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn query(
        &self,
        scope: KindScope,
        filter: &VerificationFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> Result<QueryPage, VerificationError> {
        page.validate()?;

        let matching = self.matching(scope, filter, sort)?;
        let total_count = matching.len();

        let (items, total_pages, page_size) = match page.page_size {
            PageSize::Unbounded => {
                let total_pages = usize::from(total_count > 0);
                let items = if page.page == 1 { matching } else { Vec::new() };
                (items, total_pages, None)
            }
            PageSize::Limited(size) => {
                let total_pages = total_count.div_ceil(size);
                let items = (page.page - 1)
                    .checked_mul(size)
                    .map(|offset| matching.into_iter().skip(offset).take(size).collect())
                    .unwrap_or_default();
                (items, total_pages, Some(size))
            }
        };

        Ok(QueryPage {
            items,
            total_count,
            total_pages,
            page: page.page,
            page_size,
        })
    }

    /// Every profile matching the filter, fully ordered. A cross-kind scope reads one store
    /// snapshot; each profile carries its own `kind` tag.
    pub fn matching(
        &self,
        scope: KindScope,
        filter: &VerificationFilter,
        sort: SortSpec,
    ) -> Result<Vec<ApplicantProfile>, VerificationError> {
        let needle = filter.needle();
        let candidates = match scope {
            KindScope::All => self.store.list_all()?,
            KindScope::Kind(kind) => self.store.list(kind)?,
        };

        let mut matching: Vec<ApplicantProfile> = candidates
            .into_iter()
            .filter(|profile| {
                filter
                    .status
                    .map_or(true, |status| profile.verification_status() == status)
                    && needle
                        .as_deref()
                        .map_or(true, |needle| profile.matches_search(needle))
            })
            .collect();

        matching.sort_by(|left, right| sort.compare(left, right));
        Ok(matching)
    }
}
