use z3::ast::{self, Ast, Bool, Datatype, Int, Real};
use z3::{DatatypeAccessor, DatatypeBuilder, DatatypeSort, FuncDecl, Sort};

// Variant order inside the datatype declaration.
const IDX_NULL: usize = 0;
const IDX_BOOL: usize = 1;
const IDX_INT: usize = 2;
const IDX_REAL: usize = 3;
const IDX_STR: usize = 4;
const IDX_ARR: usize = 5;
const IDX_OBJ: usize = 6;

/// The tagged JSON value sort.
///
/// Seven disjoint variants: `null`, `bool(bool_val)`, `int(int_val)`,
/// `real(real_val)`, `str(str_val)`, `arr(len)`, `obj`. Datatype sorts make
/// exactly one recognizer hold of any value by construction. Array elements
/// and object membership close the recursion through three uninterpreted
/// functions instead of recursive datatype fields:
///
/// - `json_elem : (Json, Int) -> Json` — element at index
/// - `json_has  : (Json, String) -> Bool` — key presence
/// - `json_val  : (Json, String) -> Json` — value at key
///
/// Outside `[0, len)` the element mapping is unconstrained; for keys with
/// `has` false the value mapping is unconstrained. One instance of this
/// struct is created per check and owns the run's `max_array_len`.
pub struct JsonSort {
    dtype: DatatypeSort,
    elem_fn: FuncDecl,
    has_fn: FuncDecl,
    val_fn: FuncDecl,
    max_array_len: i64,
}

impl JsonSort {
    pub fn new(max_array_len: i64) -> Self {
        let dtype = DatatypeBuilder::new("Json")
            .variant("null", vec![])
            .variant(
                "bool",
                vec![("bool_val", DatatypeAccessor::Sort(Sort::bool()))],
            )
            .variant("int", vec![("int_val", DatatypeAccessor::Sort(Sort::int()))])
            .variant(
                "real",
                vec![("real_val", DatatypeAccessor::Sort(Sort::real()))],
            )
            .variant(
                "str",
                vec![("str_val", DatatypeAccessor::Sort(Sort::string()))],
            )
            .variant("arr", vec![("len", DatatypeAccessor::Sort(Sort::int()))])
            .variant("obj", vec![])
            .finish();

        let elem_fn = FuncDecl::new("json_elem", &[&dtype.sort, &Sort::int()], &dtype.sort);
        let has_fn = FuncDecl::new("json_has", &[&dtype.sort, &Sort::string()], &Sort::bool());
        let val_fn = FuncDecl::new("json_val", &[&dtype.sort, &Sort::string()], &dtype.sort);

        Self {
            dtype,
            elem_fn,
            has_fn,
            val_fn,
            max_array_len,
        }
    }

    pub fn max_array_len(&self) -> i64 {
        self.max_array_len
    }

    pub fn sort(&self) -> &Sort {
        &self.dtype.sort
    }

    pub fn new_const(&self, name: &str) -> Datatype {
        Datatype::new_const(name, &self.dtype.sort)
    }

    // ---- recognizers ----

    fn tester(&self, idx: usize, v: &Datatype) -> Bool {
        self.dtype.variants[idx]
            .tester
            .apply(&[v])
            .as_bool()
            .expect("tester yields Bool")
    }

    pub fn is_null(&self, v: &Datatype) -> Bool {
        self.tester(IDX_NULL, v)
    }

    pub fn is_bool(&self, v: &Datatype) -> Bool {
        self.tester(IDX_BOOL, v)
    }

    pub fn is_int(&self, v: &Datatype) -> Bool {
        self.tester(IDX_INT, v)
    }

    pub fn is_real(&self, v: &Datatype) -> Bool {
        self.tester(IDX_REAL, v)
    }

    pub fn is_str(&self, v: &Datatype) -> Bool {
        self.tester(IDX_STR, v)
    }

    pub fn is_arr(&self, v: &Datatype) -> Bool {
        self.tester(IDX_ARR, v)
    }

    pub fn is_obj(&self, v: &Datatype) -> Bool {
        self.tester(IDX_OBJ, v)
    }

    // ---- accessors ----

    pub fn bool_val(&self, v: &Datatype) -> Bool {
        self.dtype.variants[IDX_BOOL].accessors[0]
            .apply(&[v])
            .as_bool()
            .expect("bool_val yields Bool")
    }

    pub fn int_val(&self, v: &Datatype) -> Int {
        self.dtype.variants[IDX_INT].accessors[0]
            .apply(&[v])
            .as_int()
            .expect("int_val yields Int")
    }

    pub fn real_val(&self, v: &Datatype) -> Real {
        self.dtype.variants[IDX_REAL].accessors[0]
            .apply(&[v])
            .as_real()
            .expect("real_val yields Real")
    }

    pub fn str_val(&self, v: &Datatype) -> ast::String {
        self.dtype.variants[IDX_STR].accessors[0]
            .apply(&[v])
            .as_string()
            .expect("str_val yields String")
    }

    pub fn len(&self, v: &Datatype) -> Int {
        self.dtype.variants[IDX_ARR].accessors[0]
            .apply(&[v])
            .as_int()
            .expect("len yields Int")
    }

    pub fn elem(&self, v: &Datatype, index: i64) -> Datatype {
        self.elem_fn
            .apply(&[v, &Int::from_i64(index)])
            .as_datatype()
            .expect("json_elem yields Json")
    }

    pub fn has(&self, v: &Datatype, key: &str) -> Bool {
        self.has_fn
            .apply(&[v, &ast::String::from(key)])
            .as_bool()
            .expect("json_has yields Bool")
    }

    pub fn val(&self, v: &Datatype, key: &str) -> Datatype {
        self.val_fn
            .apply(&[v, &ast::String::from(key)])
            .as_datatype()
            .expect("json_val yields Json")
    }

    // ---- scalar constructors ----

    pub fn null_lit(&self) -> Datatype {
        self.dtype.variants[IDX_NULL]
            .constructor
            .apply(&[])
            .as_datatype()
            .expect("null constructor yields Json")
    }

    pub fn bool_lit(&self, b: bool) -> Datatype {
        self.dtype.variants[IDX_BOOL]
            .constructor
            .apply(&[&Bool::from_bool(b)])
            .as_datatype()
            .expect("bool constructor yields Json")
    }

    pub fn int_lit(&self, n: i64) -> Datatype {
        self.dtype.variants[IDX_INT]
            .constructor
            .apply(&[&Int::from_i64(n)])
            .as_datatype()
            .expect("int constructor yields Json")
    }

    pub fn real_lit(&self, numerator: i32, denominator: i32) -> Datatype {
        self.dtype.variants[IDX_REAL]
            .constructor
            .apply(&[&Real::from_real(numerator, denominator)])
            .as_datatype()
            .expect("real constructor yields Json")
    }

    pub fn str_lit(&self, s: &str) -> Datatype {
        self.dtype.variants[IDX_STR]
            .constructor
            .apply(&[&ast::String::from(s)])
            .as_datatype()
            .expect("str constructor yields Json")
    }

    /// `is_arr(v) -> 0 <= len(v) <= max_array_len`.
    ///
    /// Asserted as a top-level side constraint for every value a schema
    /// constrains, so array lengths stay inside the sealed bound even for
    /// values only reachable through `json_elem`/`json_val`.
    pub fn well_formed(&self, v: &Datatype) -> Bool {
        let len = self.len(v);
        let bounded = Bool::and(&[
            &len.ge(&Int::from_i64(0)),
            &len.le(&Int::from_i64(self.max_array_len)),
        ]);
        self.is_arr(v).implies(&bounded)
    }
}
