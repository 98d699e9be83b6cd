// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Installable units and their capability/requirement graph

use super::version::{Version, VersionRange};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Namespace of the capability every unit provides for itself
pub const UNIT_NAMESPACE: &str = "org.eclipse.equinox.p2.iu";

/// A named, versioned capability offered by a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvidedCapability {
    /// Capability namespace (e.g. `osgi.bundle`, `java.package`)
    pub namespace: String,
    /// Capability name within the namespace
    pub name: String,
    /// Offered version
    pub version: Version,
}

impl ProvidedCapability {
    /// Create a capability
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: Version) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
        }
    }
}

fn default_min() -> u32 {
    1
}

fn default_max() -> u32 {
    1
}

fn default_greedy() -> bool {
    true
}

/// A dependency on a capability within a version range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    /// Namespace of the required capability
    pub namespace: String,
    /// Name of the required capability
    pub name: String,
    /// Acceptable versions
    #[serde(default = "VersionRange::any")]
    pub range: VersionRange,
    /// Minimum cardinality; zero makes the requirement optional
    #[serde(default = "default_min")]
    pub min: u32,
    /// Maximum cardinality
    #[serde(default = "default_max")]
    pub max: u32,
    /// Whether the requirement pulls providers into a resolution
    #[serde(default = "default_greedy")]
    pub greedy: bool,
}

impl Requirement {
    /// Create a mandatory, greedy requirement
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, range: VersionRange) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            range,
            min: 1,
            max: 1,
            greedy: true,
        }
    }

    /// Requirement on another unit by id
    pub fn unit(id: impl Into<String>, range: VersionRange) -> Self {
        Self::new(UNIT_NAMESPACE, id, range)
    }

    /// Mark the requirement optional
    pub fn optional(mut self) -> Self {
        self.min = 0;
        self
    }

    /// Whether the requirement may go unsatisfied
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Whether `capability` fulfils this requirement
    pub fn is_satisfied_by(&self, capability: &ProvidedCapability) -> bool {
        capability.namespace == self.namespace
            && capability.name == self.name
            && self.range.includes(&capability.version)
    }
}

/// A versioned software component descriptor
///
/// Two units are the same unit when their id and version match; the
/// remaining fields describe that unit and take no part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "UnitDescriptor", rename_all = "camelCase")]
pub struct InstallableUnit {
    id: String,
    version: Version,
    provided_capabilities: Vec<Arc<ProvidedCapability>>,
    requirements: Vec<Arc<Requirement>>,
    meta_requirements: Vec<Arc<Requirement>>,
    properties: IndexMap<String, String>,
    singleton: bool,
}

/// Serialized form; the self capability is added on load when missing
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitDescriptor {
    id: String,
    version: Version,
    #[serde(default)]
    provided_capabilities: Vec<ProvidedCapability>,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    meta_requirements: Vec<Requirement>,
    #[serde(default)]
    properties: IndexMap<String, String>,
    #[serde(default)]
    singleton: bool,
}

impl From<UnitDescriptor> for InstallableUnit {
    fn from(raw: UnitDescriptor) -> Self {
        let mut builder = InstallableUnit::builder(raw.id, raw.version).singleton(raw.singleton);
        for capability in raw.provided_capabilities {
            builder = builder.capability(capability);
        }
        for requirement in raw.requirements {
            builder = builder.requirement(requirement);
        }
        for requirement in raw.meta_requirements {
            builder = builder.meta_requirement(requirement);
        }
        for (key, value) in raw.properties {
            builder = builder.property(key, value);
        }
        builder.build()
    }
}

impl InstallableUnit {
    /// Start building a unit
    pub fn builder(id: impl Into<String>, version: Version) -> UnitBuilder {
        UnitBuilder {
            id: id.into(),
            version,
            provided_capabilities: Vec::new(),
            requirements: Vec::new(),
            meta_requirements: Vec::new(),
            properties: IndexMap::new(),
            singleton: false,
        }
    }

    /// Unit identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Unit version
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Capabilities offered by this unit, including its self capability
    pub fn provided_capabilities(&self) -> &[Arc<ProvidedCapability>] {
        &self.provided_capabilities
    }

    /// Runtime requirements
    pub fn requirements(&self) -> &[Arc<Requirement>] {
        &self.requirements
    }

    /// Requirements of the installer itself
    pub fn meta_requirements(&self) -> &[Arc<Requirement>] {
        &self.meta_requirements
    }

    /// Free-form properties, in declaration order
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// Whether only one version of this unit may be installed
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Whether any provided capability fulfils `requirement`
    pub fn satisfies(&self, requirement: &Requirement) -> bool {
        self.provided_capabilities
            .iter()
            .any(|capability| requirement.is_satisfied_by(capability))
    }
}

impl PartialEq for InstallableUnit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for InstallableUnit {}

impl Hash for InstallableUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
    }
}

/// Builder for [`InstallableUnit`]
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    id: String,
    version: Version,
    provided_capabilities: Vec<Arc<ProvidedCapability>>,
    requirements: Vec<Arc<Requirement>>,
    meta_requirements: Vec<Arc<Requirement>>,
    properties: IndexMap<String, String>,
    singleton: bool,
}

impl UnitBuilder {
    /// Add a provided capability
    pub fn capability(mut self, capability: ProvidedCapability) -> Self {
        self.provided_capabilities.push(Arc::new(capability));
        self
    }

    /// Shorthand for [`UnitBuilder::capability`]
    pub fn provides(self, namespace: &str, name: &str, version: Version) -> Self {
        self.capability(ProvidedCapability::new(namespace, name, version))
    }

    /// Add a requirement
    pub fn requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(Arc::new(requirement));
        self
    }

    /// Require another unit by id within `range`
    pub fn requires_unit(self, id: &str, range: VersionRange) -> Self {
        self.requirement(Requirement::unit(id, range))
    }

    /// Add a meta requirement
    pub fn meta_requirement(mut self, requirement: Requirement) -> Self {
        self.meta_requirements.push(Arc::new(requirement));
        self
    }

    /// Set a property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Mark as singleton
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    /// Finish the unit
    pub fn build(mut self) -> InstallableUnit {
        let has_self = self
            .provided_capabilities
            .iter()
            .any(|c| c.namespace == UNIT_NAMESPACE && c.name == self.id);
        if !has_self {
            self.provided_capabilities.insert(
                0,
                Arc::new(ProvidedCapability::new(
                    UNIT_NAMESPACE,
                    self.id.clone(),
                    self.version.clone(),
                )),
            );
        }

        InstallableUnit {
            id: self.id,
            version: self.version,
            provided_capabilities: self.provided_capabilities,
            requirements: self.requirements,
            meta_requirements: self.meta_requirements,
            properties: self.properties,
            singleton: self.singleton,
        }
    }
}
