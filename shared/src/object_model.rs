use crate::{
    error::RtiError,
    interaction::{interaction_class::InteractionClass, interaction_class_set::InteractionClassSet},
    object::{object_class::ObjectClass, object_class_set::ObjectClassSet},
    types::{
        AttributeHandle, InteractionClassHandle, ObjectClassHandle, ParameterHandle,
        SecurityLevel, PUBLIC_LEVEL,
    },
};

/// The class trees a federation starts from. Every federation gets its own
/// copy, so declarations and instances never leak between federations.
#[derive(Clone, Debug, Default)]
pub struct ObjectModel {
    object_classes: ObjectClassSet,
    interaction_classes: InteractionClassSet,
}

impl ObjectModel {
    pub fn builder() -> ObjectModelBuilder {
        ObjectModelBuilder::default()
    }

    pub fn object_classes(&self) -> &ObjectClassSet {
        &self.object_classes
    }

    pub fn interaction_classes(&self) -> &InteractionClassSet {
        &self.interaction_classes
    }

    pub fn into_parts(self) -> (ObjectClassSet, InteractionClassSet) {
        (self.object_classes, self.interaction_classes)
    }
}

#[derive(Clone, Debug)]
struct ClassDeclaration {
    name: String,
    parent: Option<String>,
    members: Vec<String>,
    level: SecurityLevel,
}

impl ClassDeclaration {
    fn new(name: &str, parent: Option<&str>, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            members: members.iter().map(|member| member.to_string()).collect(),
            level: PUBLIC_LEVEL,
        }
    }
}

/// Declares classes by name; handles are assigned in declaration order.
/// Parents must be declared before their children. A child's own
/// attributes (or parameters) are numbered after the ones it inherits.
#[derive(Clone, Debug, Default)]
pub struct ObjectModelBuilder {
    object_classes: Vec<ClassDeclaration>,
    interaction_classes: Vec<ClassDeclaration>,
}

impl ObjectModelBuilder {
    pub fn object_class(mut self, name: &str, parent: Option<&str>, attributes: &[&str]) -> Self {
        self.object_classes
            .push(ClassDeclaration::new(name, parent, attributes));
        self
    }

    pub fn interaction_class(
        mut self,
        name: &str,
        parent: Option<&str>,
        parameters: &[&str],
    ) -> Self {
        self.interaction_classes
            .push(ClassDeclaration::new(name, parent, parameters));
        self
    }

    /// Security level of the most recently declared root class. Children
    /// inherit their parent's level.
    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        if let Some(class) = self.object_classes.last_mut() {
            class.level = level;
        }
        self
    }

    pub fn build(self) -> Result<ObjectModel, RtiError> {
        let mut object_classes = ObjectClassSet::new();
        for (index, declaration) in self.object_classes.iter().enumerate() {
            let handle = ObjectClassHandle::new(index as i32 + 1);
            let parent = match &declaration.parent {
                Some(name) => Some(object_classes.get_handle_from_name(name)?),
                None => None,
            };
            let inherited = match parent {
                Some(parent) => object_classes
                    .get_with_handle(parent)?
                    .attributes()
                    .map(|attribute| attribute.handle().value())
                    .max()
                    .unwrap_or(0),
                None => 0,
            };
            let mut class = ObjectClass::new(handle, declaration.name.as_str(), declaration.level);
            for (offset, attribute) in declaration.members.iter().enumerate() {
                class.add_attribute(
                    AttributeHandle::new(inherited + offset as i32 + 1),
                    attribute.as_str(),
                )?;
            }
            object_classes.add_class(class, parent)?;
        }

        let mut interaction_classes = InteractionClassSet::new();
        for (index, declaration) in self.interaction_classes.iter().enumerate() {
            let handle = InteractionClassHandle::new(index as i32 + 1);
            let parent = match &declaration.parent {
                Some(name) => Some(interaction_classes.get_handle_from_name(name)?),
                None => None,
            };
            let inherited = match parent {
                Some(parent) => interaction_classes
                    .get_with_handle(parent)?
                    .parameters
                    .keys()
                    .map(|parameter| parameter.value())
                    .max()
                    .unwrap_or(0),
                None => 0,
            };
            let mut class =
                InteractionClass::new(handle, declaration.name.as_str(), declaration.level);
            for (offset, parameter) in declaration.members.iter().enumerate() {
                class.add_parameter(
                    ParameterHandle::new(inherited + offset as i32 + 1),
                    parameter.as_str(),
                )?;
            }
            interaction_classes.add_class(class, parent)?;
        }

        Ok(ObjectModel {
            object_classes,
            interaction_classes,
        })
    }
}
