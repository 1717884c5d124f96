//! Customer use-case service.
//!
//! # Responsibility
//! - Keep customer names unique on create and update.
//! - Delete a customer together with all of its posts.
//!
//! # Invariants
//! - Cascade delete runs posts-then-customer inside one outer transaction;
//!   either both deletions are visible afterwards or neither is.
//! - A missing customer is reported before anything is written.

use crate::error::ErrorKind;
use crate::model::customer::{Customer, CustomerId};
use crate::model::post::Post;
use crate::repo::entity::Entity;
use crate::repo::entity_store::UpdateOutcome;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::{Filter, FilterOp};
use crate::repo::transaction::TransactionScope;
use crate::service::repository_service::RepositoryService;
use log::{info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for customer use-cases.
#[derive(Debug)]
pub enum CustomerServiceError {
    /// Customer name is blank after trim.
    BlankName,
    /// Another customer already uses this name.
    DuplicateName(String),
    /// Customer targeted by a cascade delete does not exist.
    CustomerNotFound(CustomerId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl CustomerServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BlankName => ErrorKind::InvalidArgument,
            Self::DuplicateName(_) | Self::CustomerNotFound(_) => ErrorKind::Validation,
            Self::Repo(err) => err.kind(),
        }
    }
}

impl Display for CustomerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "customer name must not be blank"),
            Self::DuplicateName(name) => write!(f, "customer name already in use: `{name}`"),
            Self::CustomerNotFound(id) => write!(f, "customer does not exist: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CustomerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CustomerServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Customer service facade; shares one connection with the post repository.
pub struct CustomerService<'conn> {
    conn: &'conn Connection,
    customers: RepositoryService<'conn, Customer>,
    posts: RepositoryService<'conn, Post>,
}

impl<'conn> CustomerService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            customers: RepositoryService::new(conn),
            posts: RepositoryService::new(conn),
        }
    }

    /// Creates a customer with a unique, trimmed name.
    pub fn create_customer(&self, mut customer: Customer) -> Result<Customer, CustomerServiceError> {
        customer.name = normalized_name(&customer.name)?;

        self.in_unit_of_work(|| {
            self.ensure_name_available(&customer.name, None)?;
            Ok(self.customers.create(customer)?)
        })
    }

    /// Replaces the customer stored under `customer_id`.
    ///
    /// # Errors
    /// - `Repo(NotFound)` when `customer_id` does not exist; checked first.
    /// - `DuplicateName` when another customer already uses the new name.
    pub fn update_customer(
        &self,
        customer_id: CustomerId,
        mut edited: Customer,
    ) -> Result<UpdateOutcome<Customer>, CustomerServiceError> {
        edited.name = normalized_name(&edited.name)?;

        self.in_unit_of_work(|| {
            if self.customers.find_by_id(customer_id)?.is_none() {
                return Err(RepoError::NotFound {
                    entity: Customer::NAME,
                    id: customer_id,
                }
                .into());
            }
            self.ensure_name_available(&edited.name, Some(customer_id))?;
            Ok(self.customers.update(customer_id, &edited)?)
        })
    }

    pub fn find_customer(&self, customer_id: CustomerId) -> RepoResult<Option<Customer>> {
        if customer_id <= 0 {
            return Ok(None);
        }
        self.customers.find_by_id(customer_id)
    }

    pub fn list_customers(&self) -> RepoResult<Vec<Customer>> {
        self.customers.get_all().fetch()
    }

    /// Deletes all posts of a customer, then the customer itself.
    ///
    /// Returns the deleted customer.
    pub fn delete_customer_with_posts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Customer, CustomerServiceError> {
        if customer_id <= 0 {
            return Err(CustomerServiceError::CustomerNotFound(customer_id));
        }

        let (customer, post_count) = self.in_unit_of_work(|| {
            let customer = self
                .customers
                .find_by_id(customer_id)?
                .ok_or(CustomerServiceError::CustomerNotFound(customer_id))?;

            let posts = self
                .posts
                .get_list_by_where(&Filter::eq("customer_id", customer_id))?;
            let post_count = posts.len();
            if !posts.is_empty() {
                self.posts.delete_many(posts)?;
            }

            Ok((self.customers.delete(customer)?, post_count))
        })?;

        info!(
            "event=customer_delete_cascade module=service status=ok customer_id={} posts_deleted={}",
            customer_id, post_count
        );
        Ok(customer)
    }

    fn ensure_name_available(
        &self,
        name: &str,
        excluding: Option<CustomerId>,
    ) -> Result<(), CustomerServiceError> {
        let mut filter = Filter::eq("name", name);
        if let Some(customer_id) = excluding {
            filter = filter.and("customer_id", FilterOp::Ne, customer_id);
        }

        if self.customers.get_by_where(&filter)?.is_some() {
            return Err(CustomerServiceError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Runs `work` in one outer transaction that nested repository calls join.
    fn in_unit_of_work<R>(
        &self,
        work: impl FnOnce() -> Result<R, CustomerServiceError>,
    ) -> Result<R, CustomerServiceError> {
        let scope = TransactionScope::begin(self.conn)?;
        match work() {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback() {
                    warn!(
                        "event=customer_unit_of_work module=service status=error stage=rollback error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

fn normalized_name(name: &str) -> Result<String, CustomerServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CustomerServiceError::BlankName);
    }
    Ok(trimmed.to_string())
}
