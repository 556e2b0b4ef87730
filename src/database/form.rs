use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use crate::{constants::MAX_NAME_LENGTH, images::ImageInput};

use super::{
    error::Error,
    schema::{Id, IngredientEntry},
    validation::{check_cooking_time, check_ingredients, check_tags, check_text},
};

pub type FormData = HashMap<String, Value>;

pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_json(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self::from_data(map.into_iter().collect())),
            _ => Err(Error::validation(
                "non_field_errors",
                "expected a JSON object",
            )),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<&Value, Error> {
        self.inner
            .get(key)
            .ok_or_else(|| Error::validation(key, "this field is required"))
    }

    /// Accepts both JSON numbers and numeric strings.
    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        parse_number(key, self.get(key)?)
    }

    pub fn get_str(&self, key: &str) -> Result<String, Error> {
        match self.get(key)?.as_str() {
            Some(v) => Ok(v.to_string()),
            None => Err(Error::validation(key, "not a valid string")),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<&Vec<Value>, Error> {
        match self.get(key)?.as_array() {
            Some(list) => Ok(list),
            None => Err(Error::validation(key, "expected a list of items")),
        }
    }

    /// Runs `getter` only when the key was sent.
    pub fn optional<'a, T, F>(&'a self, key: &str, getter: F) -> Result<Option<T>, Error>
    where
        F: FnOnce(&'a Self, &str) -> Result<T, Error>,
    {
        if !self.contains(key) {
            return Ok(None);
        }
        getter(self, key).map(Some)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &Value) -> Result<T, Error> {
    let invalid = || Error::validation(key, "a valid integer is required");
    match value {
        Value::Number(n) => n.to_string().parse().map_err(|_| invalid()),
        Value::String(s) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode {
    Create,
    Update,
}

/// A recipe payload. Absent fields stay `None`; on update they leave the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<ImageInput>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientEntry>>,
}

impl TryFrom<Form> for RecipeDraft {
    type Error = Error;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        let image = form
            .optional("image", Form::get_str)?
            .map(|image| ImageInput::parse(&image))
            .transpose()?;

        let tags = form
            .optional("tags", Form::get_list)?
            .map(|list| {
                list.iter()
                    .map(|value| parse_number::<Id>("tags", value))
                    .collect::<Result<Vec<Id>, Error>>()
            })
            .transpose()?;

        let ingredients = form
            .optional("ingredients", Form::get_list)?
            .map(|list| {
                list.iter()
                    .map(parse_ingredient_entry)
                    .collect::<Result<Vec<IngredientEntry>, Error>>()
            })
            .transpose()?;

        Ok(Self {
            name: form.optional("name", Form::get_str)?,
            text: form.optional("text", Form::get_str)?,
            cooking_time: form.optional("cooking_time", Form::get_number)?,
            image,
            tags,
            ingredients,
        })
    }
}

fn parse_ingredient_entry(value: &Value) -> Result<IngredientEntry, Error> {
    let entry = Form::from_json(value.to_owned())
        .and_then(|form| {
            Ok(IngredientEntry {
                id: form.get_number("id")?,
                amount: form.get_number("amount")?,
            })
        })
        .map_err(|e| match e {
            Error::Validation { field, message } => {
                Error::validation("ingredients", format!("{field}: {message}"))
            }
            e => e,
        })?;
    Ok(entry)
}

/// A validated create payload with every field present.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: ImageInput,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientEntry>,
}

fn present<T>(field: &str, value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| Error::validation(field, "this field is required"))
}

impl RecipeDraft {
    pub fn from_json(value: Value) -> Result<Self, Error> {
        Self::try_from(Form::from_json(value)?)
    }

    pub fn into_new(self) -> Result<NewRecipe, Error> {
        let draft = self.validate(DraftMode::Create)?;

        Ok(NewRecipe {
            name: present("name", draft.name)?,
            text: present("text", draft.text)?,
            cooking_time: present("cooking_time", draft.cooking_time)?,
            image: present("image", draft.image)?,
            tags: present("tags", draft.tags)?,
            ingredients: present("ingredients", draft.ingredients)?,
        })
    }

    /// Checks every present field and, on create, that nothing is missing.
    /// Returns the draft with text fields trimmed.
    pub fn validate(self, mode: DraftMode) -> Result<Self, Error> {
        if mode == DraftMode::Create {
            let missing = [
                ("name", self.name.is_none()),
                ("text", self.text.is_none()),
                ("cooking_time", self.cooking_time.is_none()),
                ("image", self.image.is_none()),
                ("tags", self.tags.is_none()),
                ("ingredients", self.ingredients.is_none()),
            ];
            if let Some((field, _)) = missing.iter().find(|(_, missing)| *missing) {
                return Err(Error::validation(field, "this field is required"));
            }
        }

        if let Some(tags) = &self.tags {
            check_tags(tags)?;
        }
        if let Some(ingredients) = &self.ingredients {
            check_ingredients(ingredients)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            check_cooking_time(cooking_time)?;
        }

        Ok(Self {
            name: self
                .name
                .map(|name| check_text("name", &name, MAX_NAME_LENGTH))
                .transpose()?,
            text: self
                .text
                .map(|text| check_text("text", &text, usize::MAX))
                .transpose()?,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full_payload() -> Value {
        json!({
            "name": " Pancakes ",
            "text": "Mix and fry.",
            "cooking_time": "15",
            "image": "data:image/png;base64,aGVsbG8=",
            "tags": [1, "2"],
            "ingredients": [{"id": 3, "amount": 200}, {"id": "4", "amount": "2"}]
        })
    }

    #[test]
    fn parses_a_full_payload() {
        let draft = RecipeDraft::from_json(full_payload())
            .unwrap()
            .validate(DraftMode::Create)
            .unwrap();

        assert_eq!(draft.name.as_deref(), Some("Pancakes"));
        assert_eq!(draft.cooking_time, Some(15));
        assert_eq!(draft.tags, Some(vec![1, 2]));
        assert_eq!(
            draft.ingredients,
            Some(vec![
                IngredientEntry { id: 3, amount: 200 },
                IngredientEntry { id: 4, amount: 2 },
            ])
        );
        assert!(matches!(draft.image, Some(ImageInput::Inline(_))));
    }

    #[test]
    fn complete_drafts_become_new_recipes() {
        let recipe = RecipeDraft::from_json(full_payload())
            .unwrap()
            .into_new()
            .unwrap();
        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.tags, vec![1, 2]);

        let error = RecipeDraft::from_json(json!({ "name": "Soup" }))
            .unwrap()
            .into_new()
            .unwrap_err();
        assert_eq!(error.to_string(), "text: this field is required");
    }

    #[test]
    fn create_requires_every_field() {
        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("tags");

        let error = RecipeDraft::from_json(payload)
            .unwrap()
            .validate(DraftMode::Create)
            .unwrap_err();
        assert_eq!(error.to_string(), "tags: this field is required");
    }

    #[test]
    fn empty_sets_are_rejected_on_create() {
        let mut payload = full_payload();
        payload["ingredients"] = json!([]);
        let error = RecipeDraft::from_json(payload)
            .unwrap()
            .validate(DraftMode::Create)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "ingredients: at least one ingredient required"
        );

        let mut payload = full_payload();
        payload["tags"] = json!([]);
        let error = RecipeDraft::from_json(payload)
            .unwrap()
            .validate(DraftMode::Create)
            .unwrap_err();
        assert_eq!(error.to_string(), "tags: at least one tag required");
    }

    #[test]
    fn update_keeps_absent_fields_absent() {
        let draft = RecipeDraft::from_json(json!({ "cooking_time": 5 }))
            .unwrap()
            .validate(DraftMode::Update)
            .unwrap();

        assert_eq!(draft.cooking_time, Some(5));
        assert_eq!(draft.tags, None);
        assert_eq!(draft.ingredients, None);
        assert_eq!(draft.image, None);
    }

    #[test]
    fn update_with_empty_tags_is_rejected() {
        let error = RecipeDraft::from_json(json!({ "tags": [] }))
            .unwrap()
            .validate(DraftMode::Update)
            .unwrap_err();
        assert_eq!(error.to_string(), "tags: at least one tag required");
    }

    #[test]
    fn non_integer_numbers_are_rejected() {
        let error = RecipeDraft::from_json(json!({ "cooking_time": 2.5 })).unwrap_err();
        assert_eq!(error.to_string(), "cooking_time: a valid integer is required");

        let error =
            RecipeDraft::from_json(json!({ "ingredients": [{"id": 1, "amount": "lots"}] }))
                .unwrap_err();
        assert_eq!(
            error.to_string(),
            "ingredients: amount: a valid integer is required"
        );

        let error = RecipeDraft::from_json(json!({ "cooking_time": 0 }))
            .unwrap()
            .validate(DraftMode::Update)
            .unwrap_err();
        assert!(matches!(error, Error::Validation { ref field, .. } if field == "cooking_time"));
    }

    #[test]
    fn payload_must_be_an_object() {
        assert!(RecipeDraft::from_json(json!([1, 2])).is_err());
    }
}
