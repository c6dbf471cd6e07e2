//! Per-language symbol and import extractors
//!
//! Each extractor walks the concrete syntax tree of its grammar and emits
//! `SymbolInfo`/`ImportInfo` from the generic node shape. Extractors never
//! special-case individual files; everything here is driven by named node
//! kinds and fields from the grammar's node-types.

use tree_sitter::Node;

use crate::models::symbol::{
    ImportInfo, Language, ParamInfo, SymbolInfo, SymbolKind, Visibility,
};

/// Extract symbols and imports from a parsed tree
pub fn extract(language: Language, root: Node, source: &str) -> (Vec<SymbolInfo>, Vec<ImportInfo>) {
    let mut ctx = Extraction {
        source,
        symbols: Vec::new(),
        imports: Vec::new(),
    };

    match language {
        Language::Rust => ctx.walk_rust(root),
        Language::Python => ctx.walk_python(root),
        Language::JavaScript | Language::TypeScript => ctx.walk_ecma(root),
        Language::Go => ctx.walk_go(root),
        Language::Java => ctx.walk_java(root),
        Language::Unknown => {}
    }

    (ctx.symbols, ctx.imports)
}

struct Extraction<'s> {
    source: &'s str,
    symbols: Vec<SymbolInfo>,
    imports: Vec<ImportInfo>,
}

impl<'s> Extraction<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field).map(|n| self.text(n).to_string())
    }

    fn located(&self, mut symbol: SymbolInfo, node: Node) -> SymbolInfo {
        let start = node.start_position();
        let end = node.end_position();
        symbol.start_line = start.row as u32 + 1;
        symbol.start_column = start.column as u32;
        symbol.end_line = end.row as u32 + 1;
        symbol.end_column = end.column as u32;
        symbol
    }

    // ========================================================================
    // Rust
    // ========================================================================

    fn walk_rust(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "struct_item" => self.rust_type(node, SymbolKind::Struct),
                "enum_item" => self.rust_type(node, SymbolKind::Enum),
                "union_item" => self.rust_type(node, SymbolKind::Struct),
                "trait_item" => {
                    self.rust_type(node, SymbolKind::Trait);
                    let parent = self.field_text(node, "name");
                    if let (Some(parent), Some(body)) = (parent, node.child_by_field_name("body")) {
                        let mut body_cursor = body.walk();
                        for item in body.named_children(&mut body_cursor) {
                            if matches!(item.kind(), "function_item" | "function_signature_item") {
                                self.rust_function(item, SymbolKind::Method, Some(&parent));
                            }
                        }
                    }
                }
                "function_item" => self.rust_function(node, SymbolKind::Function, None),
                "impl_item" => {
                    let parent = node
                        .child_by_field_name("type")
                        .map(|t| strip_generics(self.text(t)));
                    if let (Some(parent), Some(body)) = (parent, node.child_by_field_name("body")) {
                        let mut body_cursor = body.walk();
                        for item in body.named_children(&mut body_cursor) {
                            if item.kind() == "function_item" {
                                self.rust_function(item, SymbolKind::Method, Some(&parent));
                            }
                        }
                    }
                }
                "mod_item" => {
                    if let Some(name) = self.field_text(node, "name") {
                        let symbol = SymbolInfo::new(name, SymbolKind::Module)
                            .with_visibility(self.rust_visibility(node));
                        let symbol = self.located(symbol, node);
                        self.symbols.push(symbol);
                    }
                }
                "type_item" => self.rust_type(node, SymbolKind::TypeAlias),
                "const_item" | "static_item" => self.rust_type(node, SymbolKind::Constant),
                "use_declaration" => self.rust_use(node),
                _ => {}
            }
        }
    }

    fn rust_visibility(&self, node: Node) -> Visibility {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "visibility_modifier" {
                let text = self.text(child);
                return if text.contains("crate") {
                    Visibility::Internal
                } else {
                    Visibility::Public
                };
            }
        }
        Visibility::Private
    }

    fn rust_doc(&self, node: Node) -> Option<String> {
        let mut lines = Vec::new();
        let mut prev = node.prev_sibling();
        while let Some(sibling) = prev {
            if sibling.kind() == "line_comment" {
                let text = self.text(sibling);
                if let Some(doc) = text.strip_prefix("///") {
                    lines.push(doc.trim().to_string());
                    prev = sibling.prev_sibling();
                    continue;
                }
            }
            break;
        }
        if lines.is_empty() {
            None
        } else {
            lines.reverse();
            Some(lines.join("\n"))
        }
    }

    fn rust_type(&mut self, node: Node, kind: SymbolKind) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol = SymbolInfo::new(name, kind).with_visibility(self.rust_visibility(node));
        symbol.doc = self.rust_doc(node);
        if let Some(generics) = node.child_by_field_name("type_parameters") {
            let mut cursor = generics.walk();
            symbol.generics = generics
                .named_children(&mut cursor)
                .map(|g| self.text(g).to_string())
                .collect();
        }
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn rust_function(&mut self, node: Node, kind: SymbolKind, parent: Option<&str>) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol = SymbolInfo::new(name, kind).with_visibility(self.rust_visibility(node));
        symbol.doc = self.rust_doc(node);
        if let Some(parent) = parent {
            symbol.parent_name = Some(parent.to_string());
        }
        symbol.return_type = node
            .child_by_field_name("return_type")
            .map(|r| self.text(r).to_string());

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "parameter" => {
                        let name = self
                            .field_text(param, "pattern")
                            .unwrap_or_else(|| "_".to_string());
                        let mut info = ParamInfo::new(name);
                        info.type_annotation = self.field_text(param, "type");
                        symbol.parameters.push(info);
                    }
                    "self_parameter" => {
                        symbol.parameters.push(ParamInfo::new(self.text(param)));
                    }
                    "variadic_parameter" => {
                        let mut info = ParamInfo::new("...");
                        info.variadic = true;
                        symbol.parameters.push(info);
                    }
                    _ => {}
                }
            }
        }

        symbol.signature = Some(self.signature_line(node));
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn rust_use(&mut self, node: Node) {
        let Some(arg) = node.child_by_field_name("argument") else {
            return;
        };
        let text = self.text(arg).trim().to_string();
        let line = node.start_position().row as u32 + 1;
        let mut import = ImportInfo::new(String::new(), line);
        import.is_relative = text.starts_with("self::") || text.starts_with("super::");

        if let Some((module, rest)) = text.split_once("::{") {
            import.module = module.to_string();
            import.names = rest
                .trim_end_matches('}')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        } else if let Some(module) = text.strip_suffix("::*") {
            import.module = module.to_string();
            import.is_wildcard = true;
        } else if let Some((path, alias)) = text.split_once(" as ") {
            import.module = path.trim().to_string();
            import.alias = Some(alias.trim().to_string());
        } else {
            import.module = text;
        }
        self.imports.push(import);
    }

    // ========================================================================
    // Python
    // ========================================================================

    fn walk_python(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            self.python_item(node, None);
        }
    }

    fn python_item(&mut self, node: Node, parent: Option<&str>) {
        match node.kind() {
            "import_statement" => self.python_import(node),
            "import_from_statement" => self.python_import_from(node),
            "class_definition" => self.python_class(node),
            "function_definition" => {
                let kind = if parent.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                self.python_function(node, kind, parent);
            }
            "decorated_definition" => {
                if let Some(inner) = node.child_by_field_name("definition") {
                    self.python_item(inner, parent);
                }
            }
            _ => {}
        }
    }

    fn python_visibility(name: &str) -> Visibility {
        if name.starts_with('_') && !name.starts_with("__") {
            Visibility::Private
        } else if name.starts_with("__") && !name.ends_with("__") {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    fn python_class(&mut self, node: Node) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol = SymbolInfo::new(name.clone(), SymbolKind::Class)
            .with_visibility(Self::python_visibility(&name));

        if let Some(body) = node.child_by_field_name("body") {
            symbol.doc = self.python_docstring(body);
            let mut cursor = body.walk();
            for item in body.named_children(&mut cursor) {
                self.python_item(item, Some(&name));
            }
        }

        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn python_docstring(&self, body: Node) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        let raw = self.text(string);
        Some(
            raw.trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string(),
        )
    }

    fn python_function(&mut self, node: Node, kind: SymbolKind, parent: Option<&str>) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol =
            SymbolInfo::new(name.clone(), kind).with_visibility(Self::python_visibility(&name));
        if let Some(parent) = parent {
            symbol.parent_name = Some(parent.to_string());
        }
        symbol.return_type = self.field_text(node, "return_type");
        if let Some(body) = node.child_by_field_name("body") {
            symbol.doc = self.python_docstring(body);
        }

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "identifier" => {
                        symbol.parameters.push(ParamInfo::new(self.text(param)));
                    }
                    "typed_parameter" => {
                        let name = param
                            .named_child(0)
                            .map(|n| self.text(n).to_string())
                            .unwrap_or_default();
                        let mut info = ParamInfo::new(name);
                        info.type_annotation = self.field_text(param, "type");
                        symbol.parameters.push(info);
                    }
                    "default_parameter" | "typed_default_parameter" => {
                        let name = self.field_text(param, "name").unwrap_or_default();
                        let mut info = ParamInfo::new(name);
                        info.type_annotation = self.field_text(param, "type");
                        info.default_value = self.field_text(param, "value");
                        info.optional = true;
                        symbol.parameters.push(info);
                    }
                    "list_splat_pattern" | "dictionary_splat_pattern" => {
                        let mut info = ParamInfo::new(self.text(param));
                        info.variadic = true;
                        symbol.parameters.push(info);
                    }
                    _ => {}
                }
            }
        }

        symbol.signature = Some(self.signature_line(node));
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn python_import(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    self.imports.push(ImportInfo::new(self.text(child), line));
                }
                "aliased_import" => {
                    let module = self.field_text(child, "name").unwrap_or_default();
                    let mut import = ImportInfo::new(module, line);
                    import.alias = self.field_text(child, "alias");
                    self.imports.push(import);
                }
                _ => {}
            }
        }
    }

    fn python_import_from(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let module = self
            .field_text(node, "module_name")
            .unwrap_or_default();
        let mut import = ImportInfo::new(module.clone(), line);
        import.is_relative = module.starts_with('.');

        let mut cursor = node.walk();
        for name_node in node.children_by_field_name("name", &mut cursor) {
            match name_node.kind() {
                "dotted_name" => import.names.push(self.text(name_node).to_string()),
                "aliased_import" => {
                    if let Some(name) = self.field_text(name_node, "name") {
                        import.names.push(name);
                    }
                    import.alias = self.field_text(name_node, "alias");
                }
                _ => {}
            }
        }

        // `from x import *`
        let mut all_cursor = node.walk();
        if node
            .children(&mut all_cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            import.is_wildcard = true;
        }

        self.imports.push(import);
    }

    // ========================================================================
    // JavaScript / TypeScript (TSX grammar is a superset of both)
    // ========================================================================

    fn walk_ecma(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            self.ecma_item(node, Visibility::Internal);
        }
    }

    fn ecma_item(&mut self, node: Node, visibility: Visibility) {
        match node.kind() {
            "import_statement" => self.ecma_import(node),
            "export_statement" => {
                if let Some(decl) = node.child_by_field_name("declaration") {
                    self.ecma_item(decl, Visibility::Public);
                }
            }
            "class_declaration" | "abstract_class_declaration" => self.ecma_class(node, visibility),
            "function_declaration" | "generator_function_declaration" => {
                self.ecma_function(node, SymbolKind::Function, None, visibility);
            }
            "interface_declaration" => self.ecma_interface(node, visibility),
            "type_alias_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    let symbol =
                        SymbolInfo::new(name, SymbolKind::TypeAlias).with_visibility(visibility);
                    let symbol = self.located(symbol, node);
                    self.symbols.push(symbol);
                }
            }
            "enum_declaration" => {
                if let Some(name) = self.field_text(node, "name") {
                    let symbol = SymbolInfo::new(name, SymbolKind::Enum).with_visibility(visibility);
                    let symbol = self.located(symbol, node);
                    self.symbols.push(symbol);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let is_function = declarator
                        .child_by_field_name("value")
                        .is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"));
                    if is_function && let Some(name) = self.field_text(declarator, "name") {
                        let symbol = SymbolInfo::new(name, SymbolKind::Function)
                            .with_visibility(visibility);
                        let symbol = self.located(symbol, node);
                        self.symbols.push(symbol);
                    }
                }
            }
            _ => {}
        }
    }

    fn ecma_member_visibility(&self, node: Node, name: &str) -> Visibility {
        if name.starts_with('#') {
            return Visibility::Private;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "accessibility_modifier" {
                return match self.text(child) {
                    "private" => Visibility::Private,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Public,
                };
            }
        }
        Visibility::Public
    }

    fn ecma_class(&mut self, node: Node, visibility: Visibility) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let symbol = SymbolInfo::new(name.clone(), SymbolKind::Class).with_visibility(visibility);
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_definition" => {
                    self.ecma_function(member, SymbolKind::Method, Some(&name), Visibility::Public);
                }
                "public_field_definition" | "field_definition" => {
                    if let Some(field_name) = self.field_text(member, "name") {
                        let vis = self.ecma_member_visibility(member, &field_name);
                        let field = SymbolInfo::new(field_name, SymbolKind::Field)
                            .with_visibility(vis)
                            .with_parent(name.clone());
                        let field = self.located(field, member);
                        self.symbols.push(field);
                    }
                }
                _ => {}
            }
        }
    }

    fn ecma_interface(&mut self, node: Node, visibility: Visibility) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let symbol =
            SymbolInfo::new(name.clone(), SymbolKind::Interface).with_visibility(visibility);
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let kind = match member.kind() {
                "method_signature" => SymbolKind::Method,
                "property_signature" => SymbolKind::Property,
                _ => continue,
            };
            if let Some(member_name) = self.field_text(member, "name") {
                let sym = SymbolInfo::new(member_name, kind).with_parent(name.clone());
                let sym = self.located(sym, member);
                self.symbols.push(sym);
            }
        }
    }

    fn ecma_function(
        &mut self,
        node: Node,
        kind: SymbolKind,
        parent: Option<&str>,
        default_visibility: Visibility,
    ) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let visibility = if kind == SymbolKind::Method {
            self.ecma_member_visibility(node, &name)
        } else {
            default_visibility
        };
        let mut symbol = SymbolInfo::new(name, kind).with_visibility(visibility);
        if let Some(parent) = parent {
            symbol.parent_name = Some(parent.to_string());
        }
        symbol.return_type = node
            .child_by_field_name("return_type")
            .map(|r| self.text(r).trim_start_matches(':').trim().to_string());

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                match param.kind() {
                    "required_parameter" | "optional_parameter" => {
                        let name = self
                            .field_text(param, "pattern")
                            .unwrap_or_else(|| "_".to_string());
                        let mut info = ParamInfo::new(name);
                        info.type_annotation = param
                            .child_by_field_name("type")
                            .map(|t| self.text(t).trim_start_matches(':').trim().to_string());
                        info.optional = param.kind() == "optional_parameter";
                        symbol.parameters.push(info);
                    }
                    "identifier" => {
                        symbol.parameters.push(ParamInfo::new(self.text(param)));
                    }
                    "rest_pattern" => {
                        let mut info = ParamInfo::new(self.text(param));
                        info.variadic = true;
                        symbol.parameters.push(info);
                    }
                    _ => {}
                }
            }
        }

        symbol.signature = Some(self.signature_line(node));
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn ecma_import(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let module = self
            .field_text(node, "source")
            .unwrap_or_default()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        let mut import = ImportInfo::new(module.clone(), line);
        import.is_relative = module.starts_with('.');

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = child.walk();
            for item in child.named_children(&mut clause_cursor) {
                match item.kind() {
                    "identifier" => import.names.push(self.text(item).to_string()),
                    "named_imports" => {
                        let mut spec_cursor = item.walk();
                        for spec in item.named_children(&mut spec_cursor) {
                            if spec.kind() == "import_specifier"
                                && let Some(name) = self.field_text(spec, "name")
                            {
                                import.names.push(name);
                                if import.alias.is_none() {
                                    import.alias = self.field_text(spec, "alias");
                                }
                            }
                        }
                    }
                    "namespace_import" => {
                        import.is_wildcard = true;
                        import.alias = item.named_child(0).map(|n| self.text(n).to_string());
                    }
                    _ => {}
                }
            }
        }

        self.imports.push(import);
    }

    // ========================================================================
    // Go
    // ========================================================================

    fn walk_go(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "import_declaration" => self.go_imports(node),
                "function_declaration" => self.go_function(node, SymbolKind::Function, None),
                "method_declaration" => {
                    let parent = self.go_receiver(node);
                    self.go_function(node, SymbolKind::Method, parent.as_deref());
                }
                "type_declaration" => self.go_types(node),
                "const_declaration" => self.go_values(node, "const_spec", SymbolKind::Constant),
                _ => {}
            }
        }
    }

    fn go_visibility(name: &str) -> Visibility {
        if name.chars().next().is_some_and(|c| c.is_uppercase()) {
            Visibility::Public
        } else {
            Visibility::Package
        }
    }

    fn go_receiver(&self, node: Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let decl = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = decl.child_by_field_name("type")?;
        Some(self.text(ty).trim_start_matches('*').to_string())
    }

    fn go_function(&mut self, node: Node, kind: SymbolKind, parent: Option<&str>) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol =
            SymbolInfo::new(name.clone(), kind).with_visibility(Self::go_visibility(&name));
        if let Some(parent) = parent {
            symbol.parent_name = Some(parent.to_string());
        }
        symbol.return_type = self.field_text(node, "result");

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for decl in params.named_children(&mut cursor) {
                if !matches!(decl.kind(), "parameter_declaration" | "variadic_parameter_declaration")
                {
                    continue;
                }
                let ty = self.field_text(decl, "type");
                let variadic = decl.kind() == "variadic_parameter_declaration";
                let mut name_cursor = decl.walk();
                let mut named_any = false;
                for name_node in decl.children_by_field_name("name", &mut name_cursor) {
                    named_any = true;
                    let mut info = ParamInfo::new(self.text(name_node));
                    info.type_annotation = ty.clone();
                    info.variadic = variadic;
                    symbol.parameters.push(info);
                }
                if !named_any && let Some(ty) = ty {
                    // Unnamed parameter (interface-style signature)
                    let mut info = ParamInfo::new("_");
                    info.type_annotation = Some(ty);
                    info.variadic = variadic;
                    symbol.parameters.push(info);
                }
            }
        }

        symbol.signature = Some(self.signature_line(node));
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn go_types(&mut self, node: Node) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if !matches!(spec.kind(), "type_spec" | "type_alias") {
                continue;
            }
            let Some(name) = self.field_text(spec, "name") else {
                continue;
            };
            let type_node = spec.child_by_field_name("type");
            let kind = match type_node.map(|t| t.kind()) {
                Some("struct_type") => SymbolKind::Struct,
                Some("interface_type") => SymbolKind::Interface,
                _ => SymbolKind::TypeAlias,
            };
            let symbol = SymbolInfo::new(name.clone(), kind)
                .with_visibility(Self::go_visibility(&name));
            let symbol = self.located(symbol, spec);
            self.symbols.push(symbol);

            match kind {
                SymbolKind::Struct => {
                    if let Some(ty) = type_node {
                        self.go_struct_fields(ty, &name);
                    }
                }
                SymbolKind::Interface => {
                    if let Some(ty) = type_node {
                        self.go_interface_methods(ty, &name);
                    }
                }
                _ => {}
            }
        }
    }

    fn go_struct_fields(&mut self, struct_type: Node, parent: &str) {
        let Some(fields) = struct_type
            .named_child(0)
            .filter(|n| n.kind() == "field_declaration_list")
        else {
            return;
        };
        let mut cursor = fields.walk();
        for field in fields.named_children(&mut cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let ty = self.field_text(field, "type");
            let mut name_cursor = field.walk();
            for name_node in field.children_by_field_name("name", &mut name_cursor) {
                let name = self.text(name_node).to_string();
                let mut symbol = SymbolInfo::new(name.clone(), SymbolKind::Field)
                    .with_visibility(Self::go_visibility(&name))
                    .with_parent(parent);
                symbol.return_type = ty.clone();
                let symbol = self.located(symbol, field);
                self.symbols.push(symbol);
            }
        }
    }

    fn go_interface_methods(&mut self, interface_type: Node, parent: &str) {
        let mut cursor = interface_type.walk();
        for member in interface_type.named_children(&mut cursor) {
            // method_elem in current grammars, method_spec in older ones
            if !matches!(member.kind(), "method_elem" | "method_spec") {
                continue;
            }
            let Some(name) = self.field_text(member, "name") else {
                continue;
            };
            let mut symbol = SymbolInfo::new(name.clone(), SymbolKind::Method)
                .with_visibility(Self::go_visibility(&name))
                .with_parent(parent);
            symbol.return_type = self.field_text(member, "result");
            symbol.signature = Some(self.text(member).trim().to_string());
            let symbol = self.located(symbol, member);
            self.symbols.push(symbol);
        }
    }

    fn go_values(&mut self, node: Node, spec_kind: &str, kind: SymbolKind) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != spec_kind {
                continue;
            }
            let mut name_cursor = spec.walk();
            for name_node in spec.children_by_field_name("name", &mut name_cursor) {
                let name = self.text(name_node).to_string();
                let symbol =
                    SymbolInfo::new(name.clone(), kind).with_visibility(Self::go_visibility(&name));
                let symbol = self.located(symbol, spec);
                self.symbols.push(symbol);
            }
        }
    }

    fn go_imports(&mut self, node: Node) {
        let mut specs = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => {
                    let mut list_cursor = child.walk();
                    specs.extend(
                        child
                            .named_children(&mut list_cursor)
                            .filter(|c| c.kind() == "import_spec"),
                    );
                }
                _ => {}
            }
        }

        for spec in specs {
            let module = self
                .field_text(spec, "path")
                .unwrap_or_default()
                .trim_matches('"')
                .to_string();
            let line = spec.start_position().row as u32 + 1;
            let mut import = ImportInfo::new(module, line);
            if let Some(name) = spec.child_by_field_name("name") {
                match self.text(name) {
                    "." => import.is_wildcard = true,
                    "_" => {}
                    alias => import.alias = Some(alias.to_string()),
                }
            }
            self.imports.push(import);
        }
    }

    // ========================================================================
    // Java
    // ========================================================================

    fn walk_java(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "import_declaration" => self.java_import(node),
                "class_declaration" => self.java_type(node, SymbolKind::Class),
                "interface_declaration" => self.java_type(node, SymbolKind::Interface),
                "enum_declaration" => self.java_type(node, SymbolKind::Enum),
                "record_declaration" => self.java_type(node, SymbolKind::Class),
                _ => {}
            }
        }
    }

    fn java_visibility(&self, node: Node) -> Visibility {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "modifiers" {
                let text = self.text(child);
                if text.contains("public") {
                    return Visibility::Public;
                }
                if text.contains("private") {
                    return Visibility::Private;
                }
                if text.contains("protected") {
                    return Visibility::Protected;
                }
            }
        }
        Visibility::Package
    }

    fn java_modifiers(&self, node: Node) -> Vec<String> {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "modifiers" {
                return self
                    .text(child)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
            }
        }
        Vec::new()
    }

    fn java_type(&mut self, node: Node, kind: SymbolKind) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol =
            SymbolInfo::new(name.clone(), kind).with_visibility(self.java_visibility(node));
        symbol.modifiers = self.java_modifiers(node);
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" | "constructor_declaration" => {
                    self.java_method(member, &name);
                }
                "field_declaration" => {
                    let ty = self.field_text(member, "type");
                    let mut decl_cursor = member.walk();
                    for declarator in member.named_children(&mut decl_cursor) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        if let Some(field_name) = self.field_text(declarator, "name") {
                            let mut field = SymbolInfo::new(field_name, SymbolKind::Field)
                                .with_visibility(self.java_visibility(member))
                                .with_parent(name.clone());
                            field.return_type = ty.clone();
                            let field = self.located(field, member);
                            self.symbols.push(field);
                        }
                    }
                }
                "class_declaration" => self.java_type(member, SymbolKind::Class),
                _ => {}
            }
        }
    }

    fn java_method(&mut self, node: Node, parent: &str) {
        let Some(name) = self.field_text(node, "name") else {
            return;
        };
        let mut symbol = SymbolInfo::new(name, SymbolKind::Method)
            .with_visibility(self.java_visibility(node))
            .with_parent(parent);
        symbol.modifiers = self.java_modifiers(node);
        symbol.return_type = self.field_text(node, "type");

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.named_children(&mut cursor) {
                if !matches!(param.kind(), "formal_parameter" | "spread_parameter") {
                    continue;
                }
                let name = self
                    .field_text(param, "name")
                    .unwrap_or_else(|| "_".to_string());
                let mut info = ParamInfo::new(name);
                info.type_annotation = self.field_text(param, "type");
                info.variadic = param.kind() == "spread_parameter";
                symbol.parameters.push(info);
            }
        }

        symbol.signature = Some(self.signature_line(node));
        let symbol = self.located(symbol, node);
        self.symbols.push(symbol);
    }

    fn java_import(&mut self, node: Node) {
        let line = node.start_position().row as u32 + 1;
        let text = self.text(node);
        let body = text
            .trim_start_matches("import")
            .trim()
            .trim_start_matches("static")
            .trim()
            .trim_end_matches(';')
            .trim();

        let mut import = ImportInfo::new(String::new(), line);
        if let Some(module) = body.strip_suffix(".*") {
            import.module = module.to_string();
            import.is_wildcard = true;
        } else {
            import.module = body.to_string();
        }
        if text.contains("static") {
            import.names.push("static".to_string());
        }
        self.imports.push(import);
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    /// First line of a declaration, without the body opener
    fn signature_line(&self, node: Node) -> String {
        let text = self.text(node);
        let first_line = text.lines().next().unwrap_or("");
        let head = first_line.split('{').next().unwrap_or(first_line);
        head.trim()
            .trim_end_matches(':')
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `Worker<T>` -> `Worker`
fn strip_generics(name: &str) -> String {
    match name.find('<') {
        Some(idx) => name[..idx].trim().to_string(),
        None => name.trim().to_string(),
    }
}
