//! Prototypes: reusable component sets stamped onto entities.
//!
//! A [`Prototype`] is an ordered list of construction recipes, at most one
//! per component type. Applying it assigns every recipe's component to the
//! target entity in recipe order.
//!
//! ```ignore
//! let goblin = Prototype::new()
//!     .component(Health(10))
//!     .component(Position { x: 0.0, y: 0.0 });
//! let e = registry.create_entity_from(&goblin)?;
//! ```

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use crate::{component::Component, entity::Entity, registry::Registry};

/// Construction recipe for one component type.
trait Recipe: Send + Sync {
    fn component_type(&self) -> TypeId;

    fn component_name(&self) -> &'static str;

    /// Assign a fresh component to `entity`. False if the entity is dead.
    fn apply_to_entity(&self, registry: &mut Registry, entity: Entity) -> bool;

    /// Overwrite `component` if it has this recipe's type.
    fn apply_to_any(&self, component: &mut dyn Any) -> bool;
}

struct ComponentRecipe<T, F> {
    make: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Recipe for ComponentRecipe<T, F>
where
    T: Component,
    F: Fn() -> T + Send + Sync + 'static,
{
    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn apply_to_entity(&self, registry: &mut Registry, entity: Entity) -> bool {
        registry.assign_component(entity, (self.make)()).is_some()
    }

    fn apply_to_any(&self, component: &mut dyn Any) -> bool {
        match component.downcast_mut::<T>() {
            Some(slot) => {
                *slot = (self.make)();
                true
            }
            None => false,
        }
    }
}

/// Ordered component recipes, one per type.
#[derive(Clone, Default)]
pub struct Prototype {
    recipes: Vec<Arc<dyn Recipe>>,
}

impl Prototype {
    /// Create an empty prototype.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as the recipe for `T`, replacing an earlier one.
    ///
    /// A replaced recipe keeps its position in apply order.
    pub fn component<T: Component + Clone>(self, value: T) -> Self {
        self.component_with(move || value.clone())
    }

    /// Record a constructor as the recipe for `T`, replacing an earlier one.
    pub fn component_with<T, F>(mut self, make: F) -> Self
    where
        T: Component,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.set_recipe(
            Arc::new(ComponentRecipe {
                make,
                _marker: PhantomData,
            }),
            true,
        );
        self
    }

    fn set_recipe(&mut self, recipe: Arc<dyn Recipe>, overwrite: bool) {
        let ty = recipe.component_type();
        match self.recipes.iter().position(|r| r.component_type() == ty) {
            Some(index) if overwrite => self.recipes[index] = recipe,
            Some(_) => {}
            None => self.recipes.push(recipe),
        }
    }

    /// Union with `other`'s recipes.
    ///
    /// On a type collision `self`'s recipe is kept unless `overwrite` is set.
    pub fn merge_with(mut self, other: &Prototype, overwrite: bool) -> Self {
        for recipe in &other.recipes {
            self.set_recipe(Arc::clone(recipe), overwrite);
        }
        self
    }

    /// Assign every recipe's component to `entity`, in recipe order.
    ///
    /// Returns `false` without touching anything if `entity` is dead.
    pub fn apply_to(&self, registry: &mut Registry, entity: Entity) -> bool {
        if !registry.valid_entity(entity) {
            return false;
        }
        for recipe in &self.recipes {
            recipe.apply_to_entity(registry, entity);
        }
        true
    }

    /// Overwrite `component` from the recipe for `T`, if there is one.
    pub fn apply_to_component<T: Component>(&self, component: &mut T) -> bool {
        let ty = TypeId::of::<T>();
        self.recipes
            .iter()
            .find(|recipe| recipe.component_type() == ty)
            .is_some_and(|recipe| recipe.apply_to_any(component))
    }

    /// Check if there is a recipe for `T`.
    #[must_use]
    pub fn contains<T: Component>(&self) -> bool {
        let ty = TypeId::of::<T>();
        self.recipes.iter().any(|recipe| recipe.component_type() == ty)
    }

    /// Number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if the prototype has no recipes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.recipes.iter().map(|recipe| recipe.component_name()))
            .finish()
    }
}
