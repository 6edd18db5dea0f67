use std::fmt;

use serde_json::{Number, Value};

use super::Item;
use crate::error::FormError;

/// The six collections managed by the admin client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Game catalog entries.
    Games,
    /// Admin accounts.
    Users,
    /// Game developers.
    Developers,
    /// Game genres.
    Genres,
    /// Game publishers.
    Publishers,
    /// Age ratings.
    Ratings,
}

/// How a form input is edited and converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, sent as a JSON string.
    Text,
    /// Numeric input, sent as a JSON number.
    Number,
    /// Text that is masked while typing.
    Secret,
}

/// One input of an add/edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    /// JSON field name.
    pub name: &'static str,
    /// Label shown next to the input.
    pub label: &'static str,
    /// Input behaviour.
    pub kind: FieldKind,
    /// Initial value for new items.
    pub default: &'static str,
}

impl FormField {
    const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            default: "",
        }
    }

    const fn number(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Number,
            default: "",
        }
    }

    /// Convert raw input into the JSON value submitted to the API.
    pub fn to_value(&self, input: &str) -> Result<Value, FormError> {
        match self.kind {
            FieldKind::Text | FieldKind::Secret => Ok(Value::String(input.to_string())),
            FieldKind::Number => parse_number(self.name, input),
        }
    }
}

fn parse_number(field: &str, input: &str) -> Result<Value, FormError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FormError::Missing {
            field: field.to_string(),
        });
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::Number(int.into()));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| FormError::NotANumber {
            field: field.to_string(),
            value: input.to_string(),
        })
}

/// Assemble an item from `(field, input)` pairs, validating every input.
pub fn build_item<'a>(
    inputs: impl IntoIterator<Item = (&'a FormField, &'a str)>,
) -> Result<Item, FormError> {
    let mut item = Item::new();
    for (field, input) in inputs {
        item.set(field.name, field.to_value(input)?);
    }
    Ok(item)
}

const GAME_FIELDS: &[FormField] = &[
    FormField::text("name", "Name"),
    FormField::text("platform", "Platform"),
    FormField::number("released", "Released"),
    FormField::text("genre", "Genre"),
    FormField::text("developer", "Developer"),
    FormField::text("publisher", "Publisher"),
    FormField::number("score", "Score"),
    FormField::text("rating", "Rating"),
];

const USER_CREATE_FIELDS: &[FormField] = &[
    FormField::text("username", "Username"),
    FormField {
        name: "password",
        label: "Password",
        kind: FieldKind::Secret,
        default: "",
    },
    FormField::text("fullname", "Full name"),
    FormField {
        name: "role",
        label: "Role",
        kind: FieldKind::Text,
        default: "user",
    },
];

const USER_EDIT_FIELDS: &[FormField] = &[
    FormField::text("username", "Username"),
    FormField::text("fullname", "Full name"),
];

const DEVELOPER_FIELDS: &[FormField] = &[FormField::text("nama_dev", "Developer name")];
const GENRE_FIELDS: &[FormField] = &[FormField::text("nama_genre", "Genre name")];
const PUBLISHER_FIELDS: &[FormField] = &[FormField::text("nama_pub", "Publisher name")];
const RATING_FIELDS: &[FormField] = &[FormField::text("nama_rate", "Rating name")];

impl ResourceKind {
    /// Every resource, in navigation order.
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Games,
        ResourceKind::Users,
        ResourceKind::Developers,
        ResourceKind::Genres,
        ResourceKind::Publishers,
        ResourceKind::Ratings,
    ];

    /// Path segment under `/api/`, also the key of the list payload.
    pub fn endpoint(self) -> &'static str {
        match self {
            ResourceKind::Games => "games",
            ResourceKind::Users => "users",
            ResourceKind::Developers => "developers",
            ResourceKind::Genres => "genres",
            ResourceKind::Publishers => "publishers",
            ResourceKind::Ratings => "ratings",
        }
    }

    /// Field holding the identity key.
    pub fn id_key(self) -> &'static str {
        match self {
            ResourceKind::Games => "id_game",
            ResourceKind::Users => "id",
            ResourceKind::Developers => "id_dev",
            ResourceKind::Genres => "id_genre",
            ResourceKind::Publishers => "id_pub",
            ResourceKind::Ratings => "id_rate",
        }
    }

    /// Fields matched by the search box. The first one is the display field.
    pub fn search_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Games => &["name"],
            ResourceKind::Users => &["username", "fullname"],
            ResourceKind::Developers => &["nama_dev"],
            ResourceKind::Genres => &["nama_genre"],
            ResourceKind::Publishers => &["nama_pub"],
            ResourceKind::Ratings => &["nama_rate"],
        }
    }

    /// Field used as the item's title in lists.
    pub fn display_field(self) -> &'static str {
        self.search_fields()[0]
    }

    /// Items shown per page.
    pub fn page_size(self) -> usize {
        match self {
            ResourceKind::Games => 10,
            ResourceKind::Users => 6,
            ResourceKind::Developers => 5,
            ResourceKind::Genres => 5,
            ResourceKind::Publishers => 6,
            ResourceKind::Ratings => 7,
        }
    }

    /// Inputs of the "add" form.
    pub fn create_fields(self) -> &'static [FormField] {
        match self {
            ResourceKind::Games => GAME_FIELDS,
            ResourceKind::Users => USER_CREATE_FIELDS,
            ResourceKind::Developers => DEVELOPER_FIELDS,
            ResourceKind::Genres => GENRE_FIELDS,
            ResourceKind::Publishers => PUBLISHER_FIELDS,
            ResourceKind::Ratings => RATING_FIELDS,
        }
    }

    /// Inputs of the "edit" form. Users cannot change passwords or roles here.
    pub fn edit_fields(self) -> &'static [FormField] {
        match self {
            ResourceKind::Users => USER_EDIT_FIELDS,
            other => other.create_fields(),
        }
    }

    /// Plural title, e.g. `Games`.
    pub fn title(self) -> &'static str {
        match self {
            ResourceKind::Games => "Games",
            ResourceKind::Users => "Users",
            ResourceKind::Developers => "Developers",
            ResourceKind::Genres => "Genres",
            ResourceKind::Publishers => "Publishers",
            ResourceKind::Ratings => "Ratings",
        }
    }

    /// Singular lowercase noun used in notifications.
    pub fn singular(self) -> &'static str {
        match self {
            ResourceKind::Games => "game",
            ResourceKind::Users => "user",
            ResourceKind::Developers => "developer",
            ResourceKind::Genres => "genre",
            ResourceKind::Publishers => "publisher",
            ResourceKind::Ratings => "rating",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_inputs_become_numbers() -> Result<(), FormError> {
        let fields = ResourceKind::Games.create_fields();
        let inputs = ["Doom", "PC", "1993", "Shooter", "id", "GT", "9.5", "M"];
        let item = build_item(fields.iter().zip(inputs))?;
        assert_eq!(item.get("released"), Some(&json!(1993)));
        assert_eq!(item.get("score"), Some(&json!(9.5)));
        assert_eq!(item.get("name"), Some(&json!("Doom")));
        Ok(())
    }

    #[test]
    fn invalid_numbers_are_rejected_locally() {
        let released = &ResourceKind::Games.create_fields()[2];
        assert_eq!(
            released.to_value("199x"),
            Err(FormError::NotANumber {
                field: "released".to_string(),
                value: "199x".to_string()
            })
        );
        assert_eq!(
            released.to_value("  "),
            Err(FormError::Missing {
                field: "released".to_string()
            })
        );
    }

    #[test]
    fn user_forms_differ_between_create_and_edit() {
        let create: Vec<_> = ResourceKind::Users
            .create_fields()
            .iter()
            .map(|f| f.name)
            .collect();
        let edit: Vec<_> = ResourceKind::Users
            .edit_fields()
            .iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(create, ["username", "password", "fullname", "role"]);
        assert_eq!(edit, ["username", "fullname"]);
        assert_eq!(ResourceKind::Users.create_fields()[3].default, "user");
    }
}
