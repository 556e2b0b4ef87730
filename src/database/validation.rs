use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use crate::constants::{
    MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MAX_SLUG_LENGTH, MAX_UNIT_LENGTH, MAX_USER_FIELD_LENGTH,
    MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, TAG_COLOR_PATTERN, TAG_SLUG_PATTERN,
    USERNAME_PATTERN,
};

use super::{
    error::Error,
    schema::{Id, IngredientEntry, NewIngredient, NewTag, NewUser},
};

static TAG_COLOR: OnceLock<Regex> = OnceLock::new();
static TAG_SLUG: OnceLock<Regex> = OnceLock::new();
static USERNAME: OnceLock<Regex> = OnceLock::new();

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("constant pattern compiles"))
}

/// Trims the value and checks it is non-empty and at most `max` characters long.
pub fn check_text(field: &str, value: &str, max: usize) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(field, "this field may not be blank"));
    }
    if value.chars().count() > max {
        return Err(Error::validation(
            field,
            format!("ensure this field has no more than {max} characters"),
        ));
    }
    Ok(value.to_string())
}

pub fn check_color(color: &str) -> Result<(), Error> {
    if !pattern(&TAG_COLOR, TAG_COLOR_PATTERN).is_match(color) {
        return Err(Error::validation(
            "color",
            "enter a valid hexadecimal color code",
        ));
    }
    Ok(())
}

pub fn check_slug(slug: &str) -> Result<(), Error> {
    if slug.len() > MAX_SLUG_LENGTH || !pattern(&TAG_SLUG, TAG_SLUG_PATTERN).is_match(slug) {
        return Err(Error::validation(
            "slug",
            "enter a valid slug of letters, numbers, underscores or hyphens",
        ));
    }
    Ok(())
}

pub fn check_cooking_time(cooking_time: i32) -> Result<(), Error> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(Error::validation(
            "cooking_time",
            format!("cooking time must be at least {MIN_COOKING_TIME} minute"),
        ));
    }
    Ok(())
}

pub fn check_tags(tags: &[Id]) -> Result<(), Error> {
    if tags.is_empty() {
        return Err(Error::validation("tags", "at least one tag required"));
    }
    let mut seen = HashSet::new();
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(Error::validation("tags", "tags must not repeat"));
    }
    Ok(())
}

pub fn check_ingredients(ingredients: &[IngredientEntry]) -> Result<(), Error> {
    if ingredients.is_empty() {
        return Err(Error::validation(
            "ingredients",
            "at least one ingredient required",
        ));
    }
    if ingredients
        .iter()
        .any(|entry| entry.amount < MIN_INGREDIENT_AMOUNT)
    {
        return Err(Error::validation(
            "ingredients",
            format!("amount must be at least {MIN_INGREDIENT_AMOUNT}"),
        ));
    }
    let mut seen = HashSet::new();
    if !ingredients.iter().all(|entry| seen.insert(entry.id)) {
        return Err(Error::validation("ingredients", "ingredients must not repeat"));
    }
    Ok(())
}

pub fn validate_new_tag(tag: NewTag) -> Result<NewTag, Error> {
    let name = check_text("name", &tag.name, MAX_NAME_LENGTH)?;
    check_color(&tag.color)?;
    check_slug(&tag.slug)?;

    Ok(NewTag {
        name,
        color: tag.color,
        slug: tag.slug,
    })
}

pub fn validate_new_ingredient(ingredient: NewIngredient) -> Result<NewIngredient, Error> {
    Ok(NewIngredient {
        name: check_text("name", &ingredient.name, MAX_NAME_LENGTH)?,
        measurement_unit: check_text(
            "measurement_unit",
            &ingredient.measurement_unit,
            MAX_UNIT_LENGTH,
        )?,
    })
}

pub fn check_email(email: &str) -> Result<String, Error> {
    let email = check_text("email", email, MAX_EMAIL_LENGTH)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::validation("email", "enter a valid email address"));
    }
    Ok(email.to_lowercase())
}

pub fn check_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Err(Error::validation("password", "this field may not be blank"));
    }
    Ok(())
}

pub fn validate_new_user(user: NewUser) -> Result<NewUser, Error> {
    let email = check_email(&user.email)?;
    let username = check_text("username", &user.username, MAX_USER_FIELD_LENGTH)?;
    if !pattern(&USERNAME, USERNAME_PATTERN).is_match(&username) {
        return Err(Error::validation(
            "username",
            "enter a valid username of letters, digits and @/./+/-/_ only",
        ));
    }
    check_password(&user.password)?;

    Ok(NewUser {
        email,
        username,
        first_name: check_text("first_name", &user.first_name, MAX_USER_FIELD_LENGTH)?,
        last_name: check_text("last_name", &user.last_name, MAX_USER_FIELD_LENGTH)?,
        password: user.password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(error: Error) -> String {
        match error {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_short_and_long_hex_colors() {
        assert!(check_color("#FFF").is_ok());
        assert!(check_color("#49b64e").is_ok());
        assert!(check_color("#49b64").is_err());
        assert!(check_color("49b64e").is_err());
        assert!(check_color("#GGGGGG").is_err());
    }

    #[test]
    fn slug_rejects_spaces() {
        assert!(check_slug("breakfast").is_ok());
        assert!(check_slug("late-dinner_2").is_ok());
        assert!(check_slug("late dinner").is_err());
        assert!(check_slug("").is_err());
    }

    #[test]
    fn empty_tag_list_is_rejected() {
        let error = check_tags(&[]).unwrap_err();
        assert_eq!(error.to_string(), "tags: at least one tag required");
        assert!(check_tags(&[1, 1]).is_err());
        assert!(check_tags(&[1, 2]).is_ok());
    }

    #[test]
    fn ingredient_rules() {
        let error = check_ingredients(&[]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "ingredients: at least one ingredient required"
        );

        let zero = [IngredientEntry { id: 1, amount: 0 }];
        assert_eq!(field_of(check_ingredients(&zero).unwrap_err()), "ingredients");

        let repeated = [
            IngredientEntry { id: 1, amount: 3 },
            IngredientEntry { id: 1, amount: 4 },
        ];
        assert!(check_ingredients(&repeated).is_err());

        let fine = [
            IngredientEntry { id: 1, amount: 3 },
            IngredientEntry { id: 2, amount: 1 },
        ];
        assert!(check_ingredients(&fine).is_ok());
    }

    #[test]
    fn cooking_time_must_be_positive() {
        assert!(check_cooking_time(0).is_err());
        assert!(check_cooking_time(-5).is_err());
        assert!(check_cooking_time(1).is_ok());
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        assert_eq!(check_text("name", "  Soup ", 10).unwrap(), "Soup");
        assert!(check_text("name", "   ", 10).is_err());
        assert!(check_text("name", "Borscht with sour cream", 10).is_err());
    }

    #[test]
    fn emails_are_stored_lowercase() {
        assert_eq!(
            check_email(" Cook@Example.COM ").unwrap(),
            "cook@example.com"
        );
    }

    #[test]
    fn user_fields() {
        let user = NewUser {
            email: "cook@example.com".into(),
            username: "cook.master".into(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            password: "hunter22".into(),
        };
        assert!(validate_new_user(user.clone()).is_ok());

        let bad_email = NewUser {
            email: "cook.example.com".into(),
            ..user.clone()
        };
        assert_eq!(field_of(validate_new_user(bad_email).unwrap_err()), "email");

        let bad_username = NewUser {
            username: "cook master".into(),
            ..user
        };
        assert_eq!(
            field_of(validate_new_user(bad_username).unwrap_err()),
            "username"
        );
    }
}
