//! Widget registry: the static schema of widget types.
//!
//! The registry is loaded once from a JSON catalog and never mutated. It
//! answers the structural questions the design tree asks before every edit:
//! which zones a type has, which children a zone accepts, which parents a
//! child accepts, and how properties resolve along the type hierarchy.
//!
//! Every widget type may name a `parent` type. Zones, properties, the
//! `selectable`/`moveable` flags, `allowIn`, `allowChildren`, `denyChildren`
//! and the template resolve to the nearest ancestor that declares them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{EditError, RegistryError};
use crate::value::{PropertyKind, PropertyValue};

/// The catalog shipped with the builder.
const BUILTIN_CATALOG: &str = include_str!("catalog/widgets.json");

/// How many children a zone may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "N")]
    Many,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Cardinality::One => "1",
            Cardinality::Many => "N",
        }
    }
}

/// A set of widget types, either everything (`"*"`) or an explicit list.
///
/// Matching honours inheritance: listing `ListItem` also matches `ListDivider`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTypeFilter")]
pub enum TypeFilter {
    Any,
    Only(Vec<SmolStr>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeFilter {
    One(SmolStr),
    Many(Vec<SmolStr>),
}

impl From<RawTypeFilter> for TypeFilter {
    fn from(raw: RawTypeFilter) -> Self {
        match raw {
            RawTypeFilter::One(t) if t == "*" => TypeFilter::Any,
            RawTypeFilter::One(t) => TypeFilter::Only(vec![t]),
            RawTypeFilter::Many(list) if list.iter().any(|t| t == "*") => TypeFilter::Any,
            RawTypeFilter::Many(list) => TypeFilter::Only(list),
        }
    }
}

impl Default for TypeFilter {
    fn default() -> Self {
        TypeFilter::Only(Vec::new())
    }
}

impl TypeFilter {
    fn matches(&self, registry: &WidgetRegistry, widget: &str) -> bool {
        match self {
            TypeFilter::Any => true,
            TypeFilter::Only(list) => list.iter().any(|t| registry.is_a(widget, t)),
        }
    }

    fn names(&self) -> &[SmolStr] {
        match self {
            TypeFilter::Any => &[],
            TypeFilter::Only(list) => list,
        }
    }
}

fn any_type() -> TypeFilter {
    TypeFilter::Any
}

/// A named child slot of a container type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ZoneDescriptor {
    pub name: SmolStr,
    pub cardinality: Cardinality,
    #[serde(default = "any_type")]
    pub allow: TypeFilter,
    #[serde(default)]
    pub deny: TypeFilter,
}

/// Declaration of one widget property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(default)]
    default: Option<PropertyValue>,
    /// Prefix for values generated when a node is created with auto-generation.
    #[serde(default)]
    pub auto_generate: Option<SmolStr>,
    /// Allowed values of an `enum` property.
    #[serde(default)]
    pub options: Vec<SmolStr>,
}

impl PropertySchema {
    /// The value an unset property reads as.
    pub fn default_value(&self) -> PropertyValue {
        match &self.default {
            Some(value) => value.clone(),
            None if self.kind == PropertyKind::Enum && !self.options.is_empty() => {
                PropertyValue::String(self.options[0].clone())
            }
            None => self.kind.zero(),
        }
    }

    /// Check that `value` is acceptable for this property.
    pub fn check(&self, name: &str, value: &PropertyValue) -> Result<(), EditError> {
        if !self.kind.accepts(value) {
            return Err(EditError::InvalidValue {
                property: name.into(),
                reason: format!("expected {}, got `{value}`", self.kind.as_str()),
            });
        }
        if self.kind == PropertyKind::Enum {
            let text = value.as_str().unwrap_or_default();
            if !self.options.iter().any(|o| o == text) {
                return Err(EditError::InvalidValue {
                    property: name.into(),
                    reason: format!("`{text}` is not one of {:?}", self.options),
                });
            }
        }
        Ok(())
    }
}

/// Catalog entry for one widget type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDef {
    #[serde(default)]
    pub parent: Option<SmolStr>,
    #[serde(default)]
    pub label: Option<SmolStr>,
    #[serde(default)]
    pub icon: Option<SmolStr>,
    #[serde(default)]
    pub category: Option<SmolStr>,
    #[serde(default)]
    pub selectable: Option<bool>,
    #[serde(default)]
    pub moveable: Option<bool>,
    /// Not offered by the palette. Not inherited.
    #[serde(default)]
    pub palette_hidden: bool,
    /// Opaque markup with `%UID%`, `%PROP(name)%` and `%ZONE(name)%` placeholders.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub zones: Option<Vec<ZoneDescriptor>>,
    #[serde(default)]
    pub properties: IndexMap<SmolStr, PropertySchema>,
    /// Parent types this widget accepts.
    #[serde(default)]
    pub allow_in: Option<TypeFilter>,
    /// Child types this widget accepts, independent of zone.
    #[serde(default)]
    pub allow_children: Option<TypeFilter>,
    /// Child types this widget rejects, independent of zone.
    #[serde(default)]
    pub deny_children: Option<TypeFilter>,
}

/// A widget type offered for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub widget_type: SmolStr,
    pub label: SmolStr,
    pub icon: Option<SmolStr>,
    pub category: SmolStr,
}

/// Read-only schema of all widget types.
#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    widgets: IndexMap<SmolStr, WidgetDef>,
    /// Resolved zones per type: own declarations, then inherited ones not redeclared.
    zones: IndexMap<SmolStr, Vec<ZoneDescriptor>>,
}

impl WidgetRegistry {
    /// Registry built from the catalog shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_CATALOG).expect("built-in widget catalog is valid")
    }

    /// Parse and validate a JSON catalog (`{typeName: WidgetDef, ...}`).
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let widgets: IndexMap<SmolStr, WidgetDef> =
            serde_json::from_str(json).map_err(|e| RegistryError::Catalog(e.to_string()))?;
        Self::from_defs(widgets)
    }

    /// Build from already-parsed definitions, validating cross references.
    pub fn from_defs(widgets: IndexMap<SmolStr, WidgetDef>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            widgets,
            zones: IndexMap::new(),
        };
        registry.validate()?;
        registry.zones = registry
            .widgets
            .keys()
            .map(|name| Ok((name.clone(), registry.merge_zones(name)?)))
            .collect::<Result<_, RegistryError>>()?;
        tracing::debug!(types = registry.widgets.len(), "widget registry loaded");
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let known = |name: &SmolStr, what: &str, owner: &SmolStr| {
            if self.widgets.contains_key(name) {
                Ok(())
            } else {
                Err(RegistryError::Catalog(format!(
                    "`{owner}` references unknown type `{name}` in {what}"
                )))
            }
        };

        for (name, def) in &self.widgets {
            if let Some(parent) = &def.parent {
                known(parent, "parent", name)?;
            }

            // An inheritance chain can be at most as long as the catalog.
            let mut current = def.parent.clone();
            let mut steps = 0;
            while let Some(p) = current {
                steps += 1;
                if steps > self.widgets.len() {
                    return Err(RegistryError::Catalog(format!(
                        "inheritance cycle through `{name}`"
                    )));
                }
                current = self.widgets.get(&p).and_then(|d| d.parent.clone());
            }

            for zone in def.zones.iter().flatten() {
                for t in zone.allow.names().iter().chain(zone.deny.names()) {
                    known(t, "zone filter", name)?;
                }
                let dupes = def
                    .zones
                    .iter()
                    .flatten()
                    .filter(|z| z.name == zone.name)
                    .count();
                if dupes > 1 {
                    return Err(RegistryError::Catalog(format!(
                        "`{name}` declares zone `{}` twice",
                        zone.name
                    )));
                }
            }

            for filter in [&def.allow_in, &def.allow_children, &def.deny_children]
                .into_iter()
                .flatten()
            {
                for t in filter.names() {
                    known(t, "containment rule", name)?;
                }
            }

            for (prop, schema) in &def.properties {
                if schema.kind == PropertyKind::Enum && schema.options.is_empty() {
                    return Err(RegistryError::Catalog(format!(
                        "enum property `{name}.{prop}` has no options"
                    )));
                }
                if schema.default.is_some() {
                    schema
                        .check(prop, &schema.default_value())
                        .map_err(|e| RegistryError::Catalog(format!("`{name}`: {e}")))?;
                }
            }
        }
        Ok(())
    }

    fn def(&self, widget: &str) -> Result<&WidgetDef, RegistryError> {
        self.widgets
            .get(widget)
            .ok_or_else(|| RegistryError::UnknownType(widget.into()))
    }

    /// Definitions from `widget` up to its root ancestor.
    fn lineage(&self, widget: &str) -> Result<Vec<&WidgetDef>, RegistryError> {
        let mut chain = vec![self.def(widget)?];
        while let Some(parent) = chain.last().and_then(|d| d.parent.as_deref()) {
            chain.push(self.def(parent)?);
        }
        Ok(chain)
    }

    /// First value declared along the lineage of `widget`.
    fn resolve<'a, T>(
        &'a self,
        widget: &str,
        pick: impl Fn(&'a WidgetDef) -> Option<T>,
    ) -> Result<Option<T>, RegistryError> {
        Ok(self.lineage(widget)?.into_iter().find_map(pick))
    }

    pub fn type_exists(&self, widget: &str) -> bool {
        self.widgets.contains_key(widget)
    }

    /// All type names, in catalog order.
    pub fn widget_types(&self) -> impl Iterator<Item = &SmolStr> {
        self.widgets.keys()
    }

    /// Whether `widget` is `ancestor` or inherits from it. Unknown types are never related.
    pub fn is_a(&self, widget: &str, ancestor: &str) -> bool {
        let mut current = Some(widget);
        let mut steps = 0;
        while let Some(name) = current {
            if name == ancestor {
                return self.type_exists(name);
            }
            steps += 1;
            if steps > self.widgets.len() {
                return false;
            }
            current = self.widgets.get(name).and_then(|d| d.parent.as_deref());
        }
        false
    }

    fn merge_zones(&self, widget: &str) -> Result<Vec<ZoneDescriptor>, RegistryError> {
        let mut zones: Vec<ZoneDescriptor> = Vec::new();
        for def in self.lineage(widget)? {
            for zone in def.zones.iter().flatten() {
                if !zones.iter().any(|z| z.name == zone.name) {
                    zones.push(zone.clone());
                }
            }
        }
        Ok(zones)
    }

    /// Zones of `widget`: its own in declaration order, then inherited ones
    /// it does not redeclare, nearest ancestor first.
    pub fn zones(&self, widget: &str) -> Result<&[ZoneDescriptor], RegistryError> {
        self.zones
            .get(widget)
            .map(Vec::as_slice)
            .ok_or_else(|| RegistryError::UnknownType(widget.into()))
    }

    pub fn zone(&self, widget: &str, zone: &str) -> Result<&ZoneDescriptor, RegistryError> {
        self.zones(widget)?
            .iter()
            .find(|z| z.name == zone)
            .ok_or_else(|| RegistryError::UnknownZone {
                widget: widget.into(),
                zone: zone.into(),
            })
    }

    pub fn zone_cardinality(&self, widget: &str, zone: &str) -> Result<Cardinality, RegistryError> {
        Ok(self.zone(widget, zone)?.cardinality)
    }

    /// Whether `zone` of `parent` accepts `child`, by the zone's own filters only.
    pub fn zone_allows_child(
        &self,
        parent: &str,
        zone: &str,
        child: &str,
    ) -> Result<bool, RegistryError> {
        self.def(child)?;
        let zone = self.zone(parent, zone)?;
        Ok(zone.allow.matches(self, child) && !zone.deny.matches(self, child))
    }

    /// Whether `child` accepts `parent` as its parent (the child's `allowIn`).
    pub fn child_allows_parent(&self, parent: &str, child: &str) -> Result<bool, RegistryError> {
        self.def(parent)?;
        Ok(self
            .resolve(child, |d| d.allow_in.as_ref())?
            .is_none_or(|filter| filter.matches(self, parent)))
    }

    /// Whether `parent` accepts `child`, independent of zone.
    pub fn parent_allows_child(&self, parent: &str, child: &str) -> Result<bool, RegistryError> {
        self.def(child)?;
        let allowed = self
            .resolve(parent, |d| d.allow_children.as_ref())?
            .is_none_or(|filter| filter.matches(self, child));
        let denied = self
            .resolve(parent, |d| d.deny_children.as_ref())?
            .is_some_and(|filter| filter.matches(self, child));
        Ok(allowed && !denied)
    }

    /// Zones of `parent` where `child` would be legal, in declaration order.
    pub fn zones_for_child(&self, parent: &str, child: &str) -> Result<Vec<SmolStr>, RegistryError> {
        if !self.child_allows_parent(parent, child)? || !self.parent_allows_child(parent, child)? {
            return Ok(Vec::new());
        }
        let mut zones = Vec::new();
        for zone in self.zones(parent)? {
            if self.zone_allows_child(parent, &zone.name, child)? {
                zones.push(zone.name.clone());
            }
        }
        Ok(zones)
    }

    /// Full placement check: both containment sides plus the zone's filters.
    pub fn placement_allowed(
        &self,
        parent: &str,
        zone: &str,
        child: &str,
    ) -> Result<bool, RegistryError> {
        Ok(self.child_allows_parent(parent, child)?
            && self.parent_allows_child(parent, child)?
            && self.zone_allows_child(parent, zone, child)?)
    }

    pub fn property_exists(&self, widget: &str, property: &str) -> bool {
        self.property_schema(widget, property).is_ok()
    }

    pub fn property_schema(
        &self,
        widget: &str,
        property: &str,
    ) -> Result<&PropertySchema, RegistryError> {
        self.resolve(widget, |d| d.properties.get(property))?
            .ok_or_else(|| RegistryError::UnknownProperty {
                widget: widget.into(),
                property: property.into(),
            })
    }

    pub fn property_kind(&self, widget: &str, property: &str) -> Result<PropertyKind, RegistryError> {
        Ok(self.property_schema(widget, property)?.kind)
    }

    pub fn property_default(
        &self,
        widget: &str,
        property: &str,
    ) -> Result<PropertyValue, RegistryError> {
        Ok(self.property_schema(widget, property)?.default_value())
    }

    pub fn property_auto_generate(
        &self,
        widget: &str,
        property: &str,
    ) -> Result<Option<&SmolStr>, RegistryError> {
        Ok(self.property_schema(widget, property)?.auto_generate.as_ref())
    }

    pub fn property_options(&self, widget: &str, property: &str) -> Result<&[SmolStr], RegistryError> {
        Ok(&self.property_schema(widget, property)?.options)
    }

    /// Every property of `widget`, ancestors' declarations first, nearest declaration winning.
    pub fn properties(
        &self,
        widget: &str,
    ) -> Result<IndexMap<SmolStr, &PropertySchema>, RegistryError> {
        let mut props = IndexMap::new();
        for def in self.lineage(widget)?.into_iter().rev() {
            for (name, schema) in &def.properties {
                props.insert(name.clone(), schema);
            }
        }
        Ok(props)
    }

    pub fn is_selectable(&self, widget: &str) -> Result<bool, RegistryError> {
        Ok(self.resolve(widget, |d| d.selectable)?.unwrap_or(true))
    }

    pub fn is_moveable(&self, widget: &str) -> Result<bool, RegistryError> {
        Ok(self.resolve(widget, |d| d.moveable)?.unwrap_or(true))
    }

    /// Display label; falls back to the type name.
    pub fn label(&self, widget: &str) -> Result<SmolStr, RegistryError> {
        let def = self.def(widget)?;
        Ok(def.label.clone().unwrap_or_else(|| widget.into()))
    }

    pub fn icon(&self, widget: &str) -> Result<Option<&SmolStr>, RegistryError> {
        self.resolve(widget, |d| d.icon.as_ref())
    }

    pub fn template(&self, widget: &str) -> Result<Option<&str>, RegistryError> {
        self.resolve(widget, |d| d.template.as_deref())
    }

    /// Widget types the palette offers, in catalog order.
    pub fn palette_entries(&self) -> Vec<PaletteEntry> {
        self.widgets
            .iter()
            .filter(|(_, def)| !def.palette_hidden)
            .map(|(name, def)| PaletteEntry {
                widget_type: name.clone(),
                label: def.label.clone().unwrap_or_else(|| name.clone()),
                icon: def.icon.clone(),
                category: def
                    .category
                    .clone()
                    .or_else(|| {
                        def.parent
                            .as_deref()
                            .and_then(|p| self.widgets.get(p))
                            .and_then(|p| p.category.clone())
                    })
                    .unwrap_or_else(|| SmolStr::new_static("Other")),
            })
            .collect()
    }
}
