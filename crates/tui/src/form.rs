use gamedb_core::{
    error::FormError,
    models::{build_item, value_to_string, FieldKind, FormField, Item, ResourceKind},
};

const MAX_INPUT_LEN: usize = 128;

/// Single-line text input with a cursor counted in characters.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.value.chars().count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn insert(&mut self, ch: char) {
        if ch.is_control() || self.value.chars().count() >= MAX_INPUT_LEN {
            return;
        }
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.value.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }
}

/// Whether the form adds a new item or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Add/edit modal: one input per field with a focused row.
#[derive(Debug, Clone)]
pub struct FormModal {
    kind: ResourceKind,
    mode: FormMode,
    fields: &'static [FormField],
    inputs: Vec<TextInput>,
    focus: usize,
    error: Option<String>,
}

impl FormModal {
    pub fn create(kind: ResourceKind) -> Self {
        let fields = kind.create_fields();
        Self {
            kind,
            mode: FormMode::Create,
            fields,
            inputs: fields
                .iter()
                .map(|field| TextInput::new(field.default))
                .collect(),
            focus: 0,
            error: None,
        }
    }

    pub fn edit(kind: ResourceKind, item: &Item) -> Self {
        let fields = kind.edit_fields();
        Self {
            kind,
            mode: FormMode::Edit,
            fields,
            inputs: fields
                .iter()
                .map(|field| {
                    TextInput::new(item.get(field.name).map(value_to_string).unwrap_or_default())
                })
                .collect(),
            focus: 0,
            error: None,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn title(&self) -> String {
        let verb = match self.mode {
            FormMode::Create => "Add",
            FormMode::Edit => "Edit",
        };
        format!("{verb} {}", self.kind.singular())
    }

    /// `(field, displayed text, focused)` rows; secret inputs are masked.
    pub fn rows(&self) -> impl Iterator<Item = (&FormField, String, bool)> + '_ {
        self.fields
            .iter()
            .zip(&self.inputs)
            .enumerate()
            .map(move |(idx, (field, input))| {
                let shown = match field.kind {
                    FieldKind::Secret => "*".repeat(input.value().chars().count()),
                    FieldKind::Text | FieldKind::Number => input.value().to_string(),
                };
                (field, shown, idx == self.focus)
            })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused(&mut self) -> &mut TextInput {
        &mut self.inputs[self.focus]
    }

    pub fn focused_cursor(&self) -> usize {
        self.inputs[self.focus].cursor()
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Validate every input and build the item to submit. A validation
    /// failure is kept on the form and focuses the offending field.
    pub fn submit(&mut self) -> Result<Item, FormError> {
        let result = build_item(
            self.fields
                .iter()
                .zip(self.inputs.iter().map(TextInput::value)),
        );
        if let Err(err) = &result {
            let field = match err {
                FormError::NotANumber { field, .. } | FormError::Missing { field } => field,
            };
            if let Some(pos) = self.fields.iter().position(|f| f.name == field.as_str()) {
                self.focus = pos;
            }
            self.error = Some(err.to_string());
        }
        result
    }
}
