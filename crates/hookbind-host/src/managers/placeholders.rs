//! Placeholder registry: `%identifier_params%` expansions owned by scripts.

use std::collections::BTreeMap;

use hookbind_api::{
    HookError, NativeHandle, PlaceholderFn, PlaceholderManager, PlaceholderRequest, RelationalFn,
    RelationalRequest,
};

struct RegisteredPlaceholder {
    script: String,
    identifier: String,
    author: String,
    version: String,
    function: PlaceholderFn,
    relational: Option<RelationalFn>,
}

#[derive(Default)]
pub struct PlaceholderRegistry {
    next_handle: u64,
    placeholders: BTreeMap<u64, RegisteredPlaceholder>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_mut(&mut self, identifier: &str) -> Option<&mut RegisteredPlaceholder> {
        self.placeholders
            .values_mut()
            .find(|p| p.identifier.eq_ignore_ascii_case(identifier))
    }

    pub fn request(&mut self, identifier: &str, player: Option<&str>, params: &str) -> Option<String> {
        let placeholder = self.find_mut(identifier)?;
        (placeholder.function)(&PlaceholderRequest {
            player: player.map(str::to_string),
            params: params.to_string(),
        })
    }

    /// `None` when the expansion has no relational function.
    pub fn request_relational(
        &mut self,
        identifier: &str,
        first: &str,
        second: &str,
        params: &str,
    ) -> Option<String> {
        let relational = self.find_mut(identifier)?.relational.as_mut()?;
        relational(&RelationalRequest {
            first: first.to_string(),
            second: second.to_string(),
            params: params.to_string(),
        })
    }

    /// Replace every `%identifier_params%` in `text` that an expansion answers.
    /// Unknown or unanswered placeholders are left as written.
    pub fn resolve_text(&mut self, text: &str, player: Option<&str>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let expanded = after[..end]
                .split_once('_')
                .and_then(|(identifier, params)| self.request(identifier, player, params));
            match expanded {
                Some(value) => {
                    out.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// (identifier, script, author, version) of every expansion.
    pub fn describe(&self) -> Vec<(String, String, String, String)> {
        self.placeholders
            .values()
            .map(|p| {
                (
                    p.identifier.clone(),
                    p.script.clone(),
                    p.author.clone(),
                    p.version.clone(),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.placeholders.len()
    }
}

impl PlaceholderManager for PlaceholderRegistry {
    fn register_placeholder(
        &mut self,
        script: &str,
        identifier: &str,
        author: &str,
        version: &str,
        function: PlaceholderFn,
        relational: Option<RelationalFn>,
    ) -> Result<NativeHandle, HookError> {
        if self.find_mut(identifier).is_some() {
            return Err(HookError::PlaceholderConflict(identifier.to_string()));
        }
        self.next_handle += 1;
        self.placeholders.insert(
            self.next_handle,
            RegisteredPlaceholder {
                script: script.to_string(),
                identifier: identifier.to_string(),
                author: author.to_string(),
                version: version.to_string(),
                function,
                relational,
            },
        );
        Ok(NativeHandle(self.next_handle))
    }

    fn set_relational_function(&mut self, handle: NativeHandle, function: RelationalFn) -> bool {
        match self.placeholders.get_mut(&handle.0) {
            Some(placeholder) => {
                placeholder.relational = Some(function);
                true
            }
            None => false,
        }
    }

    fn unregister_placeholder(&mut self, handle: NativeHandle) -> bool {
        self.placeholders.remove(&handle.0).is_some()
    }
}
