use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::{
    Data, DataStruct, DeriveInput, Expr, Fields, Ident, Result, Token, Type, TypeArray, Visibility,
};

macro_rules! bail {
    ($msg:expr) => {
        return ::core::result::Result::Err(::syn::Error::new(
            ::proc_macro2::Span::call_site(),
            $msg,
        ))
    };
    ($span:expr, $msg:expr) => {
        return ::core::result::Result::Err(::syn::Error::new_spanned($span, $msg))
    };
}

#[proc_macro_derive(RegMap, attributes(reg, reg_map))]
pub fn reg_map_derive(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input);

    impl_reg(&input).unwrap_or_else(|err| err.into_compile_error().into())
}

/// A register (or an array of registers) of the map. Padding fields never get one.
struct Register<'f> {
    field: &'f syn::Field,
    name: &'f Ident,
    attr: RegAttr,
    len: Option<&'f Expr>,
}

fn impl_reg(ast: &DeriveInput) -> Result<TokenStream> {
    let name = &ast.ident;
    let vis = &ast.vis;
    let ptr_vis = parse_visibility(vis)?;

    // check if using a compatible repr
    check_repr(ast)?;
    let index = parse_index(ast)?;

    let Data::Struct(DataStruct { ref fields, .. }) = ast.data else {
        bail!(ast, "RegMap derive supports only structs")
    };
    let Fields::Named(named) = fields else {
        bail!(ast, "RegMap derive supports only structs with named fields")
    };
    let mut registers = Vec::new();
    for field in named.named.iter() {
        if let Some(register) = parse_field(field)? {
            registers.push(register);
        }
    }

    let ptr_name = format_ident!("{}Ptr", name);
    let mod_name = format_ident!("_mod_{}", name);
    let all_methods: Vec<_> = registers.iter().map(accessor).collect();
    let (index_def, indexed_impl) = match &index {
        Some(index) => (
            impl_index(name, vis, index, &registers),
            impl_indexed(&ptr_name, index, &registers),
        ),
        None => (quote!(), quote!()),
    };

    let doc_msg_top = format!("A pointer to the register block `{name}`.");
    let doc_msg_from_nonnull = format!(
        "\
        Creates a new `{ptr_name}`, a pointer to `{name}`.\n\
        \n\
        # Safety\n\
        - `ptr` must point to a valid instance of `{name}`;\n\
        - `ptr` must be valid for the whole lifetime `'a`;\n\
        - all fields of `{name}` must allow volatile reads/writes."
    );
    let doc_msg_from_ptr = format!(
        "\
        Creates a new `{ptr_name}`, a pointer to `{name}`.\n\
        \n\
        Use this with the peripheral base address to reach the real hardware.\n\
        \n\
        # Safety\n\
        - `ptr` must not be null;\n\
        - `ptr` must point to a valid instance of `{name}`;\n\
        - `ptr` must be valid for the whole lifetime `'a`;\n\
        - all fields of `{name}` must allow volatile reads/writes."
    );
    let doc_msg_from_mut = format!(
        "Return a pointer to `{name}` from a mutable (exclusive) reference, e.g. an in-memory \
         register file."
    );
    let all = quote!(
        #index_def

        #[allow(non_snake_case)]
        mod #mod_name {
            use super::*;
            #[doc = #doc_msg_top]
            #ptr_vis struct #ptr_name<'a> {
                ptr: ::core::ptr::NonNull<#name>,
                _ref: ::core::marker::PhantomData<&'a #name>,
            }
            impl<'a> #ptr_name<'a> {
                #[doc = #doc_msg_from_nonnull]
                #[inline]
                const unsafe fn from_nonnull(ptr: ::core::ptr::NonNull<#name>) -> Self {
                    Self {
                        ptr,
                        _ref: ::core::marker::PhantomData,
                    }
                }

                #[doc = #doc_msg_from_ptr]
                #[inline]
                pub const unsafe fn from_ptr(ptr: *mut #name) -> Self {
                    unsafe { Self::from_nonnull(::core::ptr::NonNull::new_unchecked(ptr)) }
                }

                #[doc = #doc_msg_from_mut]
                #[inline]
                pub fn from_mut(reg: &'a mut #name) -> Self {
                    // safe because we are the only borrowers (&mut)
                    // and the borrow is valid for 'a
                    unsafe { Self::from_ptr(reg) }
                }

                /// Returns a raw pointer to the underlying register block.
                #[inline]
                pub const fn as_ptr(&self) -> *mut #name {
                    self.ptr.as_ptr()
                }
                #(#all_methods)*
            }
            unsafe impl<'a> ::f411_regs::RegMapPtr<'a> for #ptr_name<'a> {
                type RegMap = #name;
                #[inline]
                unsafe fn from_nonnull(ptr: ::core::ptr::NonNull<Self::RegMap>) -> Self {
                    unsafe { Self::from_nonnull(ptr) }
                }
                #[inline]
                unsafe fn from_ptr(ptr: *mut Self::RegMap) -> Self {
                    unsafe { Self::from_ptr(ptr) }
                }
                #[inline]
                fn from_mut(reg: &'a mut Self::RegMap) -> Self {
                    Self::from_mut(reg)
                }
                #[inline]
                fn as_ptr(&self) -> *mut Self::RegMap {
                    self.as_ptr()
                }
            }
            #indexed_impl
        }
        #vis use #mod_name::#ptr_name;
    );
    Ok(all.into())
}

fn parse_visibility(vis: &Visibility) -> Result<TokenStream2> {
    Ok(match vis {
        Visibility::Inherited => quote!(pub(super)),
        Visibility::Public(_) => quote!(pub),
        Visibility::Restricted(vis_restricted) => {
            if vis_restricted.in_token.is_some() {
                bail!(
                    vis,
                    "RegMap derive does not support `pub(in ...)` visibilities"
                );
            } else {
                let path = &vis_restricted.path;
                if path.is_ident("crate") {
                    quote!(pub(crate))
                } else if path.is_ident("super") {
                    quote!(pub(in super::super))
                } else if path.is_ident("self") {
                    quote!(pub(super))
                } else {
                    bail!(vis, "RegMap derive found an unexpected visibility");
                }
            }
        }
    })
}

mod kw {
    syn::custom_keyword!(RO);
    syn::custom_keyword!(WO);
    syn::custom_keyword!(RW);
    syn::custom_keyword!(valid);
}

#[derive(Default)]
enum RegAccess {
    RO,
    WO,
    #[default]
    RW,
}
impl RegAccess {
    fn readable(&self) -> bool {
        !matches!(self, RegAccess::WO)
    }
    fn writable(&self) -> bool {
        !matches!(self, RegAccess::RO)
    }
}
impl Parse for RegAccess {
    fn parse(input: ParseStream) -> Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(kw::RO) {
            input.parse::<kw::RO>().map(|_| RegAccess::RO)
        } else if lookahead.peek(kw::WO) {
            input.parse::<kw::WO>().map(|_| RegAccess::WO)
        } else if lookahead.peek(kw::RW) {
            input.parse::<kw::RW>().map(|_| RegAccess::RW)
        } else {
            Err(lookahead.error())
        }
    }
}
impl quote::ToTokens for RegAccess {
    fn to_tokens(&self, tokens: &mut TokenStream2) {
        match self {
            RegAccess::RO => tokens.extend(quote!(::f411_regs::access::ReadOnly)),
            RegAccess::WO => tokens.extend(quote!(::f411_regs::access::WriteOnly)),
            RegAccess::RW => tokens.extend(quote!(::f411_regs::access::ReadWrite)),
        }
    }
}

/// Contents of `#[reg(...)]`: an access keyword and/or `valid = <expr>`, in any order.
#[derive(Default)]
struct RegAttr {
    access: RegAccess,
    valid: Option<Expr>,
}
impl Parse for RegAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = RegAttr::default();
        while !input.is_empty() {
            if input.peek(kw::valid) {
                input.parse::<kw::valid>()?;
                input.parse::<Token![=]>()?;
                attr.valid = Some(input.parse()?);
            } else {
                attr.access = input.parse()?;
            }
            if input.is_empty() {
                break;
            }
            input.parse::<Token![,]>()?;
        }
        Ok(attr)
    }
}
impl RegAttr {
    fn valid(&self) -> TokenStream2 {
        match &self.valid {
            Some(expr) => quote!(#expr),
            None => quote!(::f411_regs::ValidBits::ALL),
        }
    }
}

fn check_repr(input: &DeriveInput) -> Result<()> {
    let mut repr_c = false;

    for attr in &input.attrs {
        if attr.path().is_ident("repr") {
            attr.parse_nested_meta(|meta| {
                // #[repr(C)]
                if meta.path.is_ident("C") {
                    repr_c = true;
                    return Ok(());
                }

                if meta.path.is_ident("transparent") {
                    return Err(meta.error("RegMap derive does not support #[repr(transparent)]"));
                }

                // #[repr(align(N))]
                if meta.path.is_ident("align") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let lit: syn::LitInt = content.parse()?;
                    lit.base10_parse::<usize>()?;
                    return Ok(());
                }

                // #[repr(packed)] or #[repr(packed(N))], omitted N means 1
                if meta.path.is_ident("packed") {
                    return Err(meta.error("RegMap derive does not support #[repr(packed)]"));
                }

                Err(meta.error("RegMap derive found an unrecognized #[repr(...)] attribute"))
            })?;
        }
    }

    if repr_c {
        Ok(())
    } else {
        bail!("RegMap derive requires #[repr(C)]")
    }
}

fn parse_index(input: &DeriveInput) -> Result<Option<Ident>> {
    let mut index = None;
    for attr in &input.attrs {
        if attr.path().is_ident("reg_map") {
            attr.parse_nested_meta(|meta| {
                // #[reg_map(index = Name)]
                if meta.path.is_ident("index") {
                    index = Some(meta.value()?.parse::<Ident>()?);
                    return Ok(());
                }
                Err(meta.error("RegMap derive found an unrecognized #[reg_map(...)] attribute"))
            })?;
        }
    }
    Ok(index)
}

fn parse_field(field: &syn::Field) -> Result<Option<Register<'_>>> {
    let name = field.ident.as_ref().expect("struct fields are named");
    let len = match &field.ty {
        Type::Array(TypeArray { elem, len, .. }) => {
            check_u32(field, elem)?;
            Some(len)
        }
        ty => {
            check_u32(field, ty)?;
            None
        }
    };
    let has_reg_attr = field.attrs.iter().any(|attr| attr.path().is_ident("reg"));
    if name.to_string().starts_with('_') {
        if has_reg_attr {
            bail!(field, "padding fields cannot carry a #[reg(...)] attribute");
        }
        return Ok(None);
    }
    let mut attr = RegAttr::default();
    for a in &field.attrs {
        if a.path().is_ident("reg") {
            attr = a.parse_args()?;
        }
    }
    Ok(Some(Register {
        field,
        name,
        attr,
        len,
    }))
}

fn check_u32(field: &syn::Field, ty: &Type) -> Result<()> {
    if let Type::Path(type_path) = ty {
        if type_path.path.is_ident("u32") {
            return Ok(());
        }
    }
    bail!(
        field,
        "RegMap derive supports only `u32` registers and arrays of `u32`"
    )
}

fn accessor(register: &Register) -> TokenStream2 {
    let name = register.name;
    let access = &register.attr.access;
    let valid = register.attr.valid();
    let doc = parse_docs(register.field);
    match register.len {
        Some(len) => quote!(
            #doc
            #[inline]
            pub fn #name (&self) -> ::f411_regs::RegArray<'a, #access, {#len}> {
                unsafe {
                    ::f411_regs::RegArray::__MACRO_ONLY__from_ptr(
                        ::core::ptr::addr_of_mut!((*self.as_ptr()).#name),
                        #valid,
                    )
                }
            }
        ),
        None => quote!(
            #doc
            #[inline]
            pub fn #name (&self) -> ::f411_regs::Reg<'a, #access> {
                unsafe {
                    ::f411_regs::Reg::__MACRO_ONLY__from_ptr(
                        ::core::ptr::addr_of_mut!((*self.as_ptr()).#name),
                        #valid,
                    )
                }
            }
        ),
    }
}

fn impl_index(
    name: &Ident,
    vis: &Visibility,
    index: &Ident,
    registers: &[Register],
) -> TokenStream2 {
    // arrays stay reachable through their accessor only
    let scalars: Vec<&Register> = registers.iter().filter(|r| r.len.is_none()).collect();
    let variants: Vec<Ident> = scalars.iter().map(|r| variant_ident(r.name)).collect();
    let fields: Vec<&Ident> = scalars.iter().map(|r| r.name).collect();
    let labels: Vec<String> = scalars
        .iter()
        .map(|r| r.name.to_string().to_uppercase())
        .collect();
    let valids: Vec<TokenStream2> = scalars.iter().map(|r| r.attr.valid()).collect();
    let readable: Vec<bool> = scalars.iter().map(|r| r.attr.access.readable()).collect();
    let writable: Vec<bool> = scalars.iter().map(|r| r.attr.access.writable()).collect();
    let docs: Vec<TokenStream2> = scalars.iter().map(|r| parse_docs(r.field)).collect();
    let count = scalars.len();
    let doc_msg_top = format!(
        "The registers of `{name}`, in memory order.\n\n\
         Generated by the derive macro `RegMap` from the field order of `{name}`."
    );
    quote!(
        #[doc = #doc_msg_top]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #vis enum #index {
            #(
                #docs
                #variants,
            )*
        }
        impl #index {
            /// Every register of the block, in memory order.
            pub const ALL: [Self; #count] = [#(Self::#variants),*];

            /// Byte offset of the register from the base address of the block.
            #[inline]
            pub const fn offset(self) -> usize {
                match self {
                    #(Self::#variants => ::core::mem::offset_of!(#name, #fields),)*
                }
            }

            /// Bits of the register that may be touched, shared by every instance of the block.
            #[inline]
            pub const fn valid_bits(self) -> ::f411_regs::ValidBits {
                match self {
                    #(Self::#variants => #valids,)*
                }
            }

            /// Reference-manual name of the register.
            #[inline]
            pub const fn name(self) -> &'static str {
                match self {
                    #(Self::#variants => #labels,)*
                }
            }

            /// Whether the register can be read.
            #[inline]
            pub const fn is_readable(self) -> bool {
                match self {
                    #(Self::#variants => #readable,)*
                }
            }

            /// Whether the register can be written.
            #[inline]
            pub const fn is_writable(self) -> bool {
                match self {
                    #(Self::#variants => #writable,)*
                }
            }
        }
        impl ::f411_regs::RegisterIndex for #index {
            const REGISTERS: &'static [Self] = &#index::ALL;
            #[inline]
            fn offset(self) -> usize {
                #index::offset(self)
            }
            #[inline]
            fn valid_bits(self) -> ::f411_regs::ValidBits {
                #index::valid_bits(self)
            }
            #[inline]
            fn name(self) -> &'static str {
                #index::name(self)
            }
        }
    )
}

fn impl_indexed(ptr_name: &Ident, index: &Ident, registers: &[Register]) -> TokenStream2 {
    let scalars: Vec<&Register> = registers.iter().filter(|r| r.len.is_none()).collect();
    let variants: Vec<Ident> = scalars.iter().map(|r| variant_ident(r.name)).collect();
    let fields: Vec<&Ident> = scalars.iter().map(|r| r.name).collect();
    quote!(
        impl<'a> ::f411_regs::Indexed<'a> for #ptr_name<'a> {
            type Index = #index;
            #[inline]
            fn reg(&self, index: #index) -> ::f411_regs::DynReg<'a> {
                match index {
                    #(#index::#variants => self.#fields().erase(),)*
                }
            }
        }
    )
}

/// `ahb1enr` -> `Ahb1enr`, `bdtr_lock` -> `BdtrLock`.
fn variant_ident(name: &Ident) -> Ident {
    let camel: String = name
        .to_string()
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    Ident::new(&camel, name.span())
}

fn parse_docs(field: &syn::Field) -> TokenStream2 {
    let mut docs = quote!();
    for attr in &field.attrs {
        if attr.path().is_ident("doc") {
            let text = &attr
                .meta
                .require_name_value()
                .expect("doc attributes are name-value")
                .value;
            docs.extend(quote!(#[doc = #text]));
        }
    }
    docs
}
