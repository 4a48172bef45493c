pub const ADJECTIVES: &[&str] = &[
    "agile", "brave", "calm", "clever", "cosmic", "daring", "eager", "fancy", "gentle", "happy",
    "honest", "jolly", "keen", "lively", "lucky", "mellow", "nimble", "polite", "proud", "quick",
    "quiet", "rapid", "shiny", "silent", "sleepy", "swift", "tidy", "vivid", "witty", "zesty",
];

pub const COLORS: &[&str] = &[
    "amber", "aqua", "azure", "beige", "black", "blue", "bronze", "coral", "crimson", "cyan",
    "gold", "gray", "green", "indigo", "ivory", "jade", "lemon", "lilac", "magenta", "maroon",
    "olive", "orange", "pink", "plum", "purple", "red", "ruby", "silver", "teal", "violet",
    "white", "yellow",
];

pub const ANIMALS: &[&str] = &[
    "alpaca", "badger", "beaver", "bison", "camel", "cheetah", "cobra", "crane", "dingo",
    "dolphin", "eagle", "falcon", "ferret", "gazelle", "gecko", "heron", "ibis", "jaguar",
    "koala", "lemur", "lynx", "marmot", "narwhal", "ocelot", "otter", "panda", "puffin",
    "quokka", "raven", "salmon", "tapir", "walrus", "wombat", "yak", "zebra",
];
