pub const BUILTINS_PACKAGE: &str = "builtins";

pub const ARRAY_OF: &str = "arrayOf";
pub const GET: &str = "get";
pub const TERNARY: &str = "ternary";

pub const EQ: &str = "eq";
pub const NEQ: &str = "neq";
pub const LT: &str = "lt";
pub const LT_EQ: &str = "ltEq";
pub const GT: &str = "gt";
pub const GT_EQ: &str = "gtEq";

pub const SUM: &str = "sum";
pub const SUB: &str = "sub";
pub const MUL: &str = "mul";
pub const DIV: &str = "div";

pub const AND: &str = "and";
pub const OR: &str = "or";
pub const NOT: &str = "not";
pub const IS_NOT_NIL: &str = "isNotNil";

pub const WHERE: &str = "where";
pub const SORT_BY: &str = "sortBy";
pub const SORT_BY_DESCENDING: &str = "sortByDescending";
pub const GROUP_BY: &str = "groupBy";
pub const UNIQUE_BY: &str = "uniqueBy";

pub const ITERATE: &str = "iterate";
pub const REDUCE: &str = "reduce";
pub const JOIN: &str = "join";

pub const WITH_ERROR: &str = "withError";
pub const RETHROW_ERROR: &str = "rethrowError";
pub const TIMED: &str = "timed";
pub const WITH_TIMEOUT: &str = "withTimeout";
pub const WITH_SIDES: &str = "withSides";

pub const SELECTORS: [&str; 5] = [WHERE, SORT_BY, SORT_BY_DESCENDING, GROUP_BY, UNIQUE_BY];

pub const SIDE: &str = "side";

pub const THIS: &str = "$this";
pub const ROOT: &str = "$root";
