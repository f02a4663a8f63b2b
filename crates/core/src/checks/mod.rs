//! Pluggable checks and the interfaces they talk through.
//!
//! Individual checks see one package at a time and may only declare needs
//! for it; set checks see the whole package set. Both report tags and
//! needs through their interface and free-form text through a
//! [`Messenger`]. Checks are registered explicitly, in the order they run.

mod builtin;
mod interface;
mod messenger;

use anyhow::Result;

use crate::model::PackageMetadata;

pub use builtin::{
    default_check_registry, FileCollisionCheck, FilenameDependencyCheck, PkgnameSuffixCheck,
    SharedLibraryCheck, FILE_COLLISION_TAG, SONAME_NOT_FOUND_TAG,
};
pub use interface::{CatalogAccess, CheckCollector, IndividualCheckInterface, SetCheckInterface};
pub use messenger::Messenger;

/// A check run once per package.
pub trait IndividualCheck: Send + Sync {
    fn name(&self) -> &str;

    fn check(
        &self,
        pkg: &PackageMetadata,
        iface: &mut IndividualCheckInterface<'_>,
        messenger: &mut Messenger,
    ) -> Result<()>;
}

/// A check run once over the whole package set.
pub trait SetCheck: Send + Sync {
    fn name(&self) -> &str;

    fn check(
        &self,
        pkgs: &[PackageMetadata],
        iface: &mut SetCheckInterface<'_>,
        messenger: &mut Messenger,
    ) -> Result<()>;
}

/// Adapts a closure into an [`IndividualCheck`].
pub struct FnIndividualCheck<F> {
    name: String,
    f: F,
}

impl<F> IndividualCheck for FnIndividualCheck<F>
where
    F: Fn(&PackageMetadata, &mut IndividualCheckInterface<'_>, &mut Messenger) -> Result<()>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(
        &self,
        pkg: &PackageMetadata,
        iface: &mut IndividualCheckInterface<'_>,
        messenger: &mut Messenger,
    ) -> Result<()> {
        (self.f)(pkg, iface, messenger)
    }
}

pub fn individual_check<F>(name: impl Into<String>, f: F) -> FnIndividualCheck<F>
where
    F: Fn(&PackageMetadata, &mut IndividualCheckInterface<'_>, &mut Messenger) -> Result<()>
        + Send
        + Sync,
{
    FnIndividualCheck { name: name.into(), f }
}

/// Adapts a closure into a [`SetCheck`].
pub struct FnSetCheck<F> {
    name: String,
    f: F,
}

impl<F> SetCheck for FnSetCheck<F>
where
    F: Fn(&[PackageMetadata], &mut SetCheckInterface<'_>, &mut Messenger) -> Result<()>
        + Send
        + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(
        &self,
        pkgs: &[PackageMetadata],
        iface: &mut SetCheckInterface<'_>,
        messenger: &mut Messenger,
    ) -> Result<()> {
        (self.f)(pkgs, iface, messenger)
    }
}

pub fn set_check<F>(name: impl Into<String>, f: F) -> FnSetCheck<F>
where
    F: Fn(&[PackageMetadata], &mut SetCheckInterface<'_>, &mut Messenger) -> Result<()>
        + Send
        + Sync,
{
    FnSetCheck { name: name.into(), f }
}

/// Ordered lists of the checks a run executes.
#[derive(Default)]
pub struct CheckRegistry {
    individual: Vec<Box<dyn IndividualCheck>>,
    set: Vec<Box<dyn SetCheck>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_individual<C: IndividualCheck + 'static>(&mut self, check: C) -> &mut Self {
        self.individual.push(Box::new(check));
        self
    }

    pub fn register_set<C: SetCheck + 'static>(&mut self, check: C) -> &mut Self {
        self.set.push(Box::new(check));
        self
    }

    pub fn individual_checks(&self) -> &[Box<dyn IndividualCheck>] {
        &self.individual
    }

    pub fn set_checks(&self) -> &[Box<dyn SetCheck>] {
        &self.set
    }

    /// Registered check names, individual checks first, in run order.
    pub fn names(&self) -> Vec<String> {
        self.individual
            .iter()
            .map(|c| c.name().to_string())
            .chain(self.set.iter().map(|c| c.name().to_string()))
            .collect()
    }
}
